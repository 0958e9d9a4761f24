//! Campaign statistics and reporting.

use std::time::Duration;

use fanout::MetricsSnapshot;
use observability::BatchStatsAggregator;

/// Statistics from a campaign run
#[derive(Debug, Clone)]
pub struct CampaignStats {
    /// Batches the campaign was configured to run
    pub batches_run: u64,

    /// Total duration of the campaign
    pub duration: Duration,

    /// Aggregated per-batch statistics
    pub batch_stats: BatchStatsAggregator,

    /// Coordinator counters
    pub coordinator: MetricsSnapshot,
}

impl CampaignStats {
    /// Batches finalized per second
    pub fn batches_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.batch_stats.total_batches as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Requests dispatched per second
    pub fn requests_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.batch_stats.total_requests as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let summary = self.batch_stats.summary();

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Campaign Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Batches: {}", summary.total_batches);
        println!("   ├─ Requests: {}", summary.total_requests);
        println!("   ├─ Batches/s: {:.2}", self.batches_per_sec());
        println!("   └─ Requests/s: {:.2}", self.requests_per_sec());

        println!("\nOutcomes");
        println!(
            "   ├─ Successes: {} ({:.2}%)",
            summary.total_successes, summary.success_rate
        );
        println!("   ├─ Failures: {}", summary.total_failures);
        println!(
            "   ├─ Timed out: {} ({:.2}%)",
            summary.total_timed_out, summary.timeout_rate
        );
        println!("   └─ Batches timed out: {}", summary.batches_timed_out);

        println!("\nLatency");
        println!("   ├─ Batch elapsed (ms): {}", summary.batch_elapsed_ms);
        println!("   └─ Reply latency (ms): {}", summary.reply_latency_ms);

        if self.coordinator.rejections_recorded > 0
            || self.coordinator.late_completions_discarded > 0
            || self.coordinator.batches_poisoned > 0
        {
            println!("\nAnomalies");
            println!(
                "   ├─ Dispatch rejections: {}",
                self.coordinator.rejections_recorded
            );
            println!(
                "   ├─ Late completions discarded: {}",
                self.coordinator.late_completions_discarded
            );
            println!(
                "   └─ Batches poisoned: {}",
                self.coordinator.batches_poisoned
            );
        }

        println!();
    }
}
