//! TimeoutGuard - aggregate deadline for one batch

use std::sync::Arc;
use std::time::Duration;

use contracts::BatchStatus;
use tracing::debug;

use crate::batch::BatchState;

/// Arm the aggregate deadline for `state`.
///
/// The deadline is anchored at the batch start, not at arming time, so the
/// dispatch loop does not eat into it. When it fires, the guard races the
/// last completion through the same terminal gate; losing the race is the
/// expected quiet case.
pub(crate) fn arm(state: &Arc<BatchState>, timeout: Duration) {
    if state.is_terminal() {
        return;
    }

    let remaining = state.remaining(timeout);
    let guard_state = Arc::clone(state);
    let task = tokio::spawn(async move {
        tokio::time::sleep(remaining).await;
        if guard_state.try_finalize(BatchStatus::TimedOut) {
            debug!(
                total = guard_state.total(),
                timeout_ms = timeout.as_millis() as u64,
                "Deadline fired, batch finalized as timed out"
            );
        }
    });

    state.set_timer(task.abort_handle());
}
