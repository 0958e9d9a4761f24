//! Batch metrics collection
//!
//! Records Prometheus metrics per finalized batch and aggregates in-memory
//! statistics for the end-of-run summary.

use contracts::{BatchResult, BatchStatus, Outcome};
use metrics::{counter, gauge, histogram};

/// Record metrics from a finalized batch.
///
/// Call once per published [`BatchResult`].
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_batch_result;
///
/// let result = handle.wait().await?;
/// record_batch_result(&result);
/// ```
pub fn record_batch_result(result: &BatchResult) {
    let status = match result.status {
        BatchStatus::Completed => "completed",
        BatchStatus::TimedOut => "timed_out",
    };
    counter!("reqfan_batches_total", "status" => status).increment(1);

    histogram!("reqfan_batch_elapsed_ms").record(result.elapsed.as_secs_f64() * 1000.0);
    gauge!("reqfan_batch_size").set(result.entries.len() as f64);

    let successes = result.success_count();
    let failures = result.failure_count();
    let timed_out = result.timed_out_count();

    counter!("reqfan_requests_total", "outcome" => "success").increment(successes as u64);
    if failures > 0 {
        counter!("reqfan_requests_total", "outcome" => "failure").increment(failures as u64);
    }
    if timed_out > 0 {
        counter!("reqfan_requests_total", "outcome" => "timed_out").increment(timed_out as u64);
    }

    for entry in &result.entries {
        if let Outcome::Success { latency, .. } = &entry.outcome {
            histogram!("reqfan_reply_latency_ms").record(latency.as_secs_f64() * 1000.0);
        }
    }
}

/// Record a synchronous dispatch rejection
pub fn record_dispatch_rejected(destination: &str) {
    counter!(
        "reqfan_dispatch_rejected_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// Record how long the initiator waited for a batch result
pub fn record_wait_latency_ms(latency_ms: f64) {
    histogram!("reqfan_wait_latency_ms").record(latency_ms);
}

/// Batch statistics aggregator
///
/// Aggregates metrics in memory for reporting a run summary.
#[derive(Debug, Clone, Default)]
pub struct BatchStatsAggregator {
    /// Batches finalized
    pub total_batches: u64,

    /// Batches that hit the deadline
    pub batches_timed_out: u64,

    /// Total requests dispatched
    pub total_requests: u64,

    /// Successful replies
    pub total_successes: u64,

    /// Failures (synchronous rejections and remote failures)
    pub total_failures: u64,

    /// Requests retired by the deadline
    pub total_timed_out: u64,

    /// Batch elapsed time statistics (ms)
    pub elapsed_stats: RunningStats,

    /// Per-reply latency statistics (ms)
    pub latency_stats: RunningStats,
}

impl BatchStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finalized batch into the aggregate
    pub fn update(&mut self, result: &BatchResult) {
        self.total_batches += 1;
        if result.status == BatchStatus::TimedOut {
            self.batches_timed_out += 1;
        }

        self.total_requests += result.entries.len() as u64;
        self.total_successes += result.success_count() as u64;
        self.total_failures += result.failure_count() as u64;
        self.total_timed_out += result.timed_out_count() as u64;

        self.elapsed_stats
            .push(result.elapsed.as_secs_f64() * 1000.0);

        for entry in &result.entries {
            if let Outcome::Success { latency, .. } = &entry.outcome {
                self.latency_stats.push(latency.as_secs_f64() * 1000.0);
            }
        }
    }

    /// Produce a summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_batches: self.total_batches,
            batches_timed_out: self.batches_timed_out,
            total_requests: self.total_requests,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            total_timed_out: self.total_timed_out,
            success_rate: if self.total_requests > 0 {
                self.total_successes as f64 / self.total_requests as f64 * 100.0
            } else {
                0.0
            },
            timeout_rate: if self.total_requests > 0 {
                self.total_timed_out as f64 / self.total_requests as f64 * 100.0
            } else {
                0.0
            },
            batch_elapsed_ms: StatsSummary::from(&self.elapsed_stats),
            reply_latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_batches: u64,
    pub batches_timed_out: u64,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_timed_out: u64,
    pub success_rate: f64,
    pub timeout_rate: f64,
    pub batch_elapsed_ms: StatsSummary,
    pub reply_latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Batch Metrics Summary ===")?;
        writeln!(
            f,
            "Batches: {} ({} timed out)",
            self.total_batches, self.batches_timed_out
        )?;
        writeln!(f, "Requests: {}", self.total_requests)?;
        writeln!(
            f,
            "Successes: {} ({:.2}%)",
            self.total_successes, self.success_rate
        )?;
        writeln!(f, "Failures: {}", self.total_failures)?;
        writeln!(
            f,
            "Timed out: {} ({:.2}%)",
            self.total_timed_out, self.timeout_rate
        )?;
        writeln!(f, "Batch elapsed (ms): {}", self.batch_elapsed_ms)?;
        writeln!(f, "Reply latency (ms): {}", self.reply_latency_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Push a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}
