//! In-Process Batch Example
//!
//! Demonstrates dispatching a single fan-out batch over the in-process
//! gateway and waiting for the aggregated result. Runs entirely in one
//! process, no external broker required.
//!
//! Run with: cargo run --bin in_process_batch

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fanout::{BatchSpec, FanOutCoordinator};
use gateway::{FaultProfile, InProcessGateway};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting In-Process Batch Demo");

    // ==== Stage 1: Build the gateway with an echo endpoint ====
    let mut gateway = InProcessGateway::new()
        .with_latency(Duration::from_millis(5), Duration::from_millis(40))
        .with_faults(FaultProfile {
            reject_rate: 0.05,
            failure_rate: 0.05,
            drop_rate: 0.05,
        });
    gateway.register_fn("simple.echo", |payload: &Bytes| Ok(payload.clone()));

    // ==== Stage 2: Start a batch ====
    let coordinator = FanOutCoordinator::new(Arc::new(gateway));
    let spec = BatchSpec {
        destination: "simple.echo".into(),
        count: 20,
        timeout: Duration::from_millis(100),
    };

    tracing::info!(
        destination = %spec.destination,
        count = spec.count,
        timeout_ms = spec.timeout.as_millis() as u64,
        "Dispatching batch"
    );
    let handle = coordinator.start(&spec, |i| Bytes::from(format!("request-{i}")));

    // ==== Stage 3: Wait for the aggregate result ====
    let result = handle.wait().await?;

    tracing::info!(
        status = ?result.status,
        successes = result.success_count(),
        failures = result.failure_count(),
        timed_out = result.timed_out_count(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "Batch finished"
    );

    for entry in &result.entries {
        match &entry.outcome {
            contracts::Outcome::Success { reply, latency } => {
                tracing::info!(
                    index = entry.index,
                    latency_ms = latency.as_millis() as u64,
                    reply = %String::from_utf8_lossy(reply),
                    "Reply"
                );
            }
            contracts::Outcome::Failure { error } => {
                tracing::warn!(index = entry.index, error = %error, "Failure");
            }
            contracts::Outcome::TimedOut => {
                tracing::warn!(index = entry.index, "Timed out");
            }
        }
    }

    let metrics = coordinator.metrics();
    tracing::info!(
        late_discarded = metrics.late_completions_discarded(),
        rejections = metrics.rejections_recorded(),
        "Coordinator metrics"
    );

    Ok(())
}
