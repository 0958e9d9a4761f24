//! ResultSink - completion intake for one batch

use std::sync::Arc;

use contracts::{Completion, CorrelationToken, Outcome};

use crate::batch::BatchState;

/// Thread-safe intake for gateway completions.
///
/// Cheap to clone; every clone feeds the same batch. The sink maps a
/// completion to an outcome, retires the pending record and drives the
/// countdown that finalizes the batch.
#[derive(Clone)]
pub struct ResultSink {
    state: Arc<BatchState>,
}

impl ResultSink {
    pub(crate) fn new(state: Arc<BatchState>) -> Self {
        Self { state }
    }

    /// Record the completion for `token`.
    ///
    /// Safe to call from any thread, including the caller of `dispatch`
    /// when a rejection is folded in synchronously. At most one completion
    /// per token is accepted; late ones are discarded, duplicates while the
    /// batch is live poison it.
    pub fn record(&self, token: CorrelationToken, completion: Completion) {
        self.state.record(token, |record| match completion {
            Completion::Reply(reply) => Outcome::Success {
                reply,
                latency: record.dispatched_at.elapsed(),
            },
            Completion::Failure(error) => Outcome::Failure { error },
        });
    }
}
