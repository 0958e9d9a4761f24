//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    batch: BatchInfo,
    gateway: GatewayInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
struct BatchInfo {
    destination: String,
    fan_out: usize,
    batches: u64,
    timeout_ms: u64,
    concurrency: usize,
}

#[derive(Serialize)]
struct GatewayInfo {
    endpoint_count: usize,
    latency_min_ms: u64,
    latency_max_ms: u64,
    reject_rate: f64,
    failure_rate: f64,
    drop_rate: f64,
}

#[derive(Serialize)]
struct EndpointInfo {
    id: String,
    kind: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let plan = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&plan, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&plan, args);
    }

    Ok(())
}

fn build_config_info(plan: &contracts::RunPlan, args: &InfoArgs) -> ConfigInfo {
    let endpoints = if args.endpoints {
        plan.gateway
            .endpoints
            .iter()
            .map(|e| EndpointInfo {
                id: e.id.to_string(),
                kind: format!("{:?}", e.kind),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        batch: BatchInfo {
            destination: plan.batch.destination.to_string(),
            fan_out: plan.batch.fan_out,
            batches: plan.batch.batches,
            timeout_ms: plan.batch.timeout_ms,
            concurrency: plan.batch.concurrency,
        },
        gateway: GatewayInfo {
            endpoint_count: plan.gateway.endpoints.len(),
            latency_min_ms: plan.gateway.latency_min_ms,
            latency_max_ms: plan.gateway.latency_max_ms,
            reject_rate: plan.gateway.reject_rate,
            failure_rate: plan.gateway.failure_rate,
            drop_rate: plan.gateway.drop_rate,
        },
        endpoints,
    }
}

fn print_config_info(plan: &contracts::RunPlan, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   Reqfan Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Batch settings
    println!("Batch");
    println!("   ├─ Destination: {}", plan.batch.destination);
    println!("   ├─ Fan-out: {}", plan.batch.fan_out);
    println!("   ├─ Batches: {}", plan.batch.batches);
    println!("   ├─ Timeout: {} ms", plan.batch.timeout_ms);
    println!("   └─ Concurrency: {}", plan.batch.concurrency);

    // Gateway settings
    println!("\nGateway");
    println!(
        "   ├─ Latency: {}..{} ms",
        plan.gateway.latency_min_ms, plan.gateway.latency_max_ms
    );
    println!("   ├─ Reject rate: {:.2}", plan.gateway.reject_rate);
    println!("   ├─ Failure rate: {:.2}", plan.gateway.failure_rate);
    println!("   └─ Drop rate: {:.2}", plan.gateway.drop_rate);

    // Endpoints
    println!("\nEndpoints ({})", plan.gateway.endpoints.len());
    for (i, endpoint) in plan.gateway.endpoints.iter().enumerate() {
        let is_last = i == plan.gateway.endpoints.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        if args.endpoints {
            println!("   {} {} ({:?})", prefix, endpoint.id, endpoint.kind);
        } else {
            println!("   {} {}", prefix, endpoint.id);
        }
    }

    println!();
}
