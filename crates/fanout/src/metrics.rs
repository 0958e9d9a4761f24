//! Coordinator metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a coordinator instance, shared across its batches
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    /// Batches started
    batches_started: AtomicU64,
    /// Batches that finalized with every request accounted for in time
    batches_completed: AtomicU64,
    /// Batches finalized by deadline expiry
    batches_timed_out: AtomicU64,
    /// Batches poisoned by a correlation violation
    batches_poisoned: AtomicU64,
    /// Successful replies recorded
    replies_recorded: AtomicU64,
    /// Asynchronous failures recorded
    failures_recorded: AtomicU64,
    /// Synchronous dispatch rejections folded into batches
    rejections_recorded: AtomicU64,
    /// Completions that arrived after the batch was already terminal
    late_completions_discarded: AtomicU64,
}

impl CoordinatorMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_started(&self) -> u64 {
        self.batches_started.load(Ordering::Relaxed)
    }

    pub fn inc_batches_started(&self) {
        self.batches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches_completed(&self) -> u64 {
        self.batches_completed.load(Ordering::Relaxed)
    }

    pub fn inc_batches_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches_timed_out(&self) -> u64 {
        self.batches_timed_out.load(Ordering::Relaxed)
    }

    pub fn inc_batches_timed_out(&self) {
        self.batches_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches_poisoned(&self) -> u64 {
        self.batches_poisoned.load(Ordering::Relaxed)
    }

    pub fn inc_batches_poisoned(&self) {
        self.batches_poisoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn replies_recorded(&self) -> u64 {
        self.replies_recorded.load(Ordering::Relaxed)
    }

    pub fn inc_replies_recorded(&self) {
        self.replies_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures_recorded(&self) -> u64 {
        self.failures_recorded.load(Ordering::Relaxed)
    }

    pub fn inc_failures_recorded(&self) {
        self.failures_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejections_recorded(&self) -> u64 {
        self.rejections_recorded.load(Ordering::Relaxed)
    }

    pub fn inc_rejections_recorded(&self) {
        self.rejections_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn late_completions_discarded(&self) -> u64 {
        self.late_completions_discarded.load(Ordering::Relaxed)
    }

    pub fn inc_late_completions_discarded(&self) {
        self.late_completions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_started: self.batches_started(),
            batches_completed: self.batches_completed(),
            batches_timed_out: self.batches_timed_out(),
            batches_poisoned: self.batches_poisoned(),
            replies_recorded: self.replies_recorded(),
            failures_recorded: self.failures_recorded(),
            rejections_recorded: self.rejections_recorded(),
            late_completions_discarded: self.late_completions_discarded(),
        }
    }
}

/// Snapshot of coordinator metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub batches_started: u64,
    pub batches_completed: u64,
    pub batches_timed_out: u64,
    pub batches_poisoned: u64,
    pub replies_recorded: u64,
    pub failures_recorded: u64,
    pub rejections_recorded: u64,
    pub late_completions_discarded: u64,
}
