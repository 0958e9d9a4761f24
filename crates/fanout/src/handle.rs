//! CompletionHandle - caller-side view of an in-flight batch

use std::sync::Arc;
use std::time::Duration;

use contracts::BatchResult;
use tokio::sync::watch;

use crate::batch::{BatchState, DoneSlot};
use crate::error::FanoutError;

/// Handle to a started batch.
///
/// Lets the initiator await the published result, poll for it, or register
/// a callback that runs at finalization. Dropping the handle does not
/// cancel the batch; in-flight requests still retire through the sink or
/// the deadline.
pub struct CompletionHandle {
    state: Arc<BatchState>,
    done_rx: watch::Receiver<DoneSlot>,
}

impl CompletionHandle {
    pub(crate) fn new(state: Arc<BatchState>) -> Self {
        let done_rx = state.subscribe();
        Self { state, done_rx }
    }

    /// Number of requests the batch was started with.
    pub fn total(&self) -> usize {
        self.state.total()
    }

    /// Whether the batch has reached its terminal point.
    pub fn is_done(&self) -> bool {
        self.done_rx.borrow().is_some()
    }

    /// The published result, if the batch already finalized.
    pub fn try_result(&self) -> Option<Result<Arc<BatchResult>, FanoutError>> {
        self.done_rx
            .borrow()
            .as_ref()
            .map(|slot| slot.clone().map_err(FanoutError::from))
    }

    /// Await the batch result.
    ///
    /// Resolves once the terminal gate closes, with the result or the
    /// violation that poisoned the batch. The batch deadline bounds this
    /// wait; no extra limit is applied.
    pub async fn wait(&self) -> Result<Arc<BatchResult>, FanoutError> {
        let mut rx = self.done_rx.clone();
        let slot = rx
            .wait_for(|slot| slot.is_some())
            .await
            .map_err(|_| FanoutError::Abandoned)?;
        match slot.as_ref() {
            Some(Ok(result)) => Ok(Arc::clone(result)),
            Some(Err(violation)) => Err(violation.clone().into()),
            None => Err(FanoutError::Abandoned),
        }
    }

    /// Await the batch result, giving up after `limit`.
    ///
    /// Giving up does not disturb the batch; it keeps running toward its
    /// own deadline.
    pub async fn wait_for(&self, limit: Duration) -> Result<Arc<BatchResult>, FanoutError> {
        tokio::time::timeout(limit, self.wait())
            .await
            .map_err(|_| FanoutError::WaitDeadline)?
    }

    /// Register a callback to run when the batch finalizes.
    ///
    /// Runs inline if the batch is already done. Callbacks are dropped
    /// without running when the batch is poisoned.
    pub fn on_done(&self, callback: impl FnOnce(&BatchResult) + Send + 'static) {
        self.state.on_done(Box::new(callback));
    }
}
