//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Reqfan - Request fan-out orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "reqfan",
    author,
    version,
    about = "Request fan-out/fan-in orchestrator",
    long_about = "Dispatches batches of correlated requests over a simulated \n\
                  request/reply gateway, collects the replies with at-most-once \n\
                  accounting and a hard aggregate deadline, and reports per-batch \n\
                  and per-run statistics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "REQFAN_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "REQFAN_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a fan-out campaign
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "REQFAN_CONFIG")]
    pub config: PathBuf,

    /// Override requests per batch from configuration
    #[arg(long, env = "REQFAN_FAN_OUT")]
    pub fan_out: Option<usize>,

    /// Override number of batches from configuration
    #[arg(long, env = "REQFAN_BATCHES")]
    pub batches: Option<u64>,

    /// Override per-batch deadline in milliseconds
    #[arg(long, env = "REQFAN_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Override batches in flight at once
    #[arg(long, env = "REQFAN_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "REQFAN_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show registered endpoint details
    #[arg(long)]
    pub endpoints: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
