//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::campaign::{Campaign, CampaignConfig};
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_campaign(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut plan = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(fan_out) = args.fan_out {
        info!(fan_out, "Overriding fan_out from CLI");
        plan.batch.fan_out = fan_out;
    }
    if let Some(batches) = args.batches {
        info!(batches, "Overriding batches from CLI");
        plan.batch.batches = batches;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        info!(timeout_ms, "Overriding timeout_ms from CLI");
        plan.batch.timeout_ms = timeout_ms;
    }
    if let Some(concurrency) = args.concurrency {
        info!(concurrency, "Overriding concurrency from CLI");
        plan.batch.concurrency = concurrency;
    }

    info!(
        destination = %plan.batch.destination,
        fan_out = plan.batch.fan_out,
        batches = plan.batch.batches,
        endpoints = plan.gateway.endpoints.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&plan);
        return Ok(());
    }

    // Build campaign configuration
    let campaign_config = CampaignConfig {
        plan,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let campaign = Campaign::new(campaign_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting campaign...");

    // Run campaign with shutdown signal
    tokio::select! {
        result = campaign.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        batches = stats.batch_stats.total_batches,
                        requests = stats.batch_stats.total_requests,
                        duration_secs = stats.duration.as_secs_f64(),
                        requests_per_sec = format!("{:.2}", stats.requests_per_sec()),
                        "Campaign completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Campaign execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping campaign...");
        }
    }

    info!("Reqfan finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => {
                warn!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(plan: &contracts::RunPlan) {
    println!("\n=== Configuration Summary ===\n");
    println!("Batch:");
    println!("  Destination: {}", plan.batch.destination);
    println!("  Fan-out: {}", plan.batch.fan_out);
    println!("  Batches: {}", plan.batch.batches);
    println!("  Timeout: {} ms", plan.batch.timeout_ms);
    println!("  Concurrency: {}", plan.batch.concurrency);

    println!("\nGateway ({} endpoints):", plan.gateway.endpoints.len());
    for endpoint in &plan.gateway.endpoints {
        println!("  - {} ({:?})", endpoint.id, endpoint.kind);
    }
    println!(
        "  Latency: {}..{} ms",
        plan.gateway.latency_min_ms, plan.gateway.latency_max_ms
    );
    if plan.gateway.reject_rate > 0.0
        || plan.gateway.failure_rate > 0.0
        || plan.gateway.drop_rate > 0.0
    {
        println!(
            "  Faults: reject={:.2}, failure={:.2}, drop={:.2}",
            plan.gateway.reject_rate, plan.gateway.failure_rate, plan.gateway.drop_rate
        );
    }

    println!();
}
