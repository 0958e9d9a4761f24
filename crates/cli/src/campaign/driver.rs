//! Campaign driver - runs configured batches through the coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use fanout::{BatchSpec, FanOutCoordinator};
use gateway::InProcessGateway;
use observability::{record_batch_result, BatchStatsAggregator};
use tokio::task::JoinSet;
use tracing::{debug, info};

use contracts::{BatchResult, RunPlan};

use super::endpoints::build_gateway;
use super::CampaignStats;

/// Campaign configuration
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// The run plan loaded from configuration
    pub plan: RunPlan,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Drives a configured number of batches through one coordinator.
pub struct Campaign {
    config: CampaignConfig,
}

impl Campaign {
    /// Create a new campaign with the given configuration
    pub fn new(config: CampaignConfig) -> Self {
        Self { config }
    }

    /// Run the campaign to completion
    pub async fn run(self) -> Result<CampaignStats> {
        let start_time = Instant::now();
        let plan = &self.config.plan;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let gateway: Arc<InProcessGateway> = Arc::new(build_gateway(&plan.gateway));
        let coordinator = Arc::new(FanOutCoordinator::new(gateway));

        let spec = BatchSpec {
            destination: plan.batch.destination.clone(),
            count: plan.batch.fan_out,
            timeout: Duration::from_millis(plan.batch.timeout_ms),
        };

        info!(
            destination = %spec.destination,
            fan_out = spec.count,
            batches = plan.batch.batches,
            concurrency = plan.batch.concurrency,
            timeout_ms = plan.batch.timeout_ms,
            "Campaign starting"
        );

        let mut aggregator = BatchStatsAggregator::new();
        let mut join_set: JoinSet<Result<Arc<BatchResult>, fanout::FanoutError>> = JoinSet::new();

        for batch_id in 0..plan.batch.batches {
            // Keep at most `concurrency` batches in flight
            while join_set.len() >= plan.batch.concurrency {
                if let Some(joined) = join_set.join_next().await {
                    Self::fold_batch(&mut aggregator, joined?)?;
                }
            }

            let coordinator = Arc::clone(&coordinator);
            let spec = spec.clone();
            join_set.spawn(async move {
                let handle =
                    coordinator.start(&spec, |index| build_request(batch_id, index));
                debug!(batch_id, "Batch dispatched");
                handle.wait().await
            });
        }

        while let Some(joined) = join_set.join_next().await {
            Self::fold_batch(&mut aggregator, joined?)?;
        }

        let snapshot = coordinator.metrics().snapshot();
        Ok(CampaignStats {
            batches_run: plan.batch.batches,
            duration: start_time.elapsed(),
            batch_stats: aggregator,
            coordinator: snapshot,
        })
    }

    fn fold_batch(
        aggregator: &mut BatchStatsAggregator,
        outcome: Result<Arc<BatchResult>, fanout::FanoutError>,
    ) -> Result<()> {
        let result = outcome.context("Batch failed to finalize")?;
        record_batch_result(&result);
        aggregator.update(&result);
        Ok(())
    }
}

/// Build the JSON request payload for one dispatch.
fn build_request(batch_id: u64, index: usize) -> Bytes {
    let payload = serde_json::json!({
        "index": index,
        "body": format!("batch-{batch_id}-req-{index}"),
    });
    Bytes::from(payload.to_string())
}
