//! Outcome and batch result types
//!
//! One [`Outcome`] is recorded per dispatched request; a finalized batch
//! publishes them all at once as a [`BatchResult`].

use std::time::Duration;

use bytes::Bytes;

use crate::CorrelationToken;

/// Terminal outcome of a single request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Reply received; `latency` measured from dispatch to recording.
    Success { reply: Bytes, latency: Duration },
    /// Synchronous rejection or asynchronous remote failure.
    Failure { error: String },
    /// Still outstanding when the batch deadline expired.
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// One slot of a batch result: which request, and how it ended.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// Dispatch index within the batch, `0..count`.
    pub index: usize,
    /// Token the request was dispatched with.
    pub token: CorrelationToken,
    /// How the request ended.
    pub outcome: Outcome,
}

/// How a batch as a whole finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every request completed (successfully or with a failure) in time.
    Completed,
    /// The deadline expired with requests still outstanding.
    TimedOut,
}

/// Published result of a finalized batch.
///
/// Invariant: `entries.len()` equals the dispatched count — every index ends
/// up with exactly one outcome, sorted by index.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub status: BatchStatus,
    pub entries: Vec<BatchEntry>,
    /// Wall time from dispatch start to finalization.
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failure()).count()
    }

    pub fn timed_out_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_timed_out())
            .count()
    }
}
