//! Load Campaign Example
//!
//! Drives many fan-out batches from a loaded run plan and aggregates the
//! results, the way the CLI's `run` command does.
//!
//! Run with: cargo run --bin load_campaign [config.toml]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use config_loader::{ConfigFormat, ConfigLoader};
use fanout::{BatchSpec, FanOutCoordinator};
use gateway::{FaultProfile, InProcessGateway};
use observability::BatchStatsAggregator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Load Campaign Demo");

    // ==== Stage 1: Use default plan or load from file ====
    let plan = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading run plan");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_demo_plan()?
    };

    // ==== Stage 2: Build the gateway from the plan ====
    let mut gateway = InProcessGateway::new()
        .with_latency(
            Duration::from_millis(plan.gateway.latency_min_ms),
            Duration::from_millis(plan.gateway.latency_max_ms),
        )
        .with_faults(FaultProfile {
            reject_rate: plan.gateway.reject_rate,
            failure_rate: plan.gateway.failure_rate,
            drop_rate: plan.gateway.drop_rate,
        });
    for endpoint in &plan.gateway.endpoints {
        let id = endpoint.id.clone();
        gateway.register_fn(id, |payload: &Bytes| Ok(payload.clone()));
        tracing::info!(endpoint = %endpoint.id, "Registered endpoint");
    }

    // ==== Stage 3: Run the batches ====
    let coordinator = FanOutCoordinator::new(Arc::new(gateway));
    let spec = BatchSpec {
        destination: plan.batch.destination.clone(),
        count: plan.batch.fan_out,
        timeout: Duration::from_millis(plan.batch.timeout_ms),
    };

    let mut aggregator = BatchStatsAggregator::new();
    for batch_id in 0..plan.batch.batches {
        let handle = coordinator.start(&spec, |i| Bytes::from(format!("batch-{batch_id}-req-{i}")));
        let result = handle.wait().await?;
        aggregator.update(&result);
    }

    // ==== Stage 4: Report ====
    println!("{}", aggregator.summary());

    let metrics = coordinator.metrics();
    tracing::info!(
        batches_completed = metrics.batches_completed(),
        batches_timed_out = metrics.batches_timed_out(),
        batches_poisoned = metrics.batches_poisoned(),
        "Campaign finished"
    );

    Ok(())
}

/// A small plan for running without a config file.
fn create_demo_plan() -> Result<contracts::RunPlan, Box<dyn std::error::Error>> {
    let plan = ConfigLoader::load_from_str(
        r#"
[batch]
destination = "simple.echo"
fan_out = 25
batches = 40
timeout_ms = 80

[gateway]
latency_min_ms = 5
latency_max_ms = 60
failure_rate = 0.05
drop_rate = 0.02

[[gateway.endpoints]]
id = "simple.echo"
"#,
        ConfigFormat::Toml,
    )?;
    Ok(plan)
}
