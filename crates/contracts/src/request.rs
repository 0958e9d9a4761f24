//! RequestRecord - per-dispatch bookkeeping

use std::time::Instant;

use crate::CorrelationToken;

/// Bookkeeping for one dispatched request.
///
/// Created at dispatch time and owned exclusively by the coordinator's batch
/// state until a terminal event (reply or timeout) retires it. Immutable
/// after creation.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// Token the request was dispatched with.
    pub token: CorrelationToken,
    /// Dispatch index within the batch.
    pub index: usize,
    /// When the request was handed to the gateway; anchors reply latency.
    pub dispatched_at: Instant,
}

impl RequestRecord {
    pub fn new(token: CorrelationToken, index: usize) -> Self {
        Self {
            token,
            index,
            dispatched_at: Instant::now(),
        }
    }
}
