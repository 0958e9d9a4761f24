//! BatchState - shared correlation state for one fan-out batch
//!
//! One `BatchState` is shared by the coordinator, the result sink, the
//! timeout guard and the completion handle. The `terminal` flag is the
//! single finalization gate: whichever party wins its compare-and-set
//! builds and publishes the result, every other path becomes a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use contracts::{BatchEntry, BatchResult, BatchStatus, CorrelationToken, Outcome, RequestRecord};

use crate::error::ConsistencyViolation;
use crate::metrics::CoordinatorMetrics;

/// Published terminal state: a result, or the violation that poisoned
/// the batch. `None` while the batch is live.
pub(crate) type DoneSlot = Option<Result<Arc<BatchResult>, ConsistencyViolation>>;

/// Callback registered via `CompletionHandle::on_done`.
pub(crate) type DoneCallback = Box<dyn FnOnce(&BatchResult) + Send + 'static>;

/// Lock that shrugs off poisoning. Critical sections here never leave the
/// maps in a torn state, so a panicked holder does not invalidate them.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mutable correlation bookkeeping, guarded as one unit so that pending
/// membership and recorded entries always agree.
pub(crate) struct BatchInner {
    /// Requests still awaiting a completion, keyed by token.
    pending: HashMap<CorrelationToken, RequestRecord>,
    /// Outcomes recorded so far, unordered until finalization.
    entries: Vec<BatchEntry>,
}

/// Shared state of one in-flight batch.
pub(crate) struct BatchState {
    /// Requests dispatched for this batch.
    total: usize,
    /// Requests not yet accounted for. Signed so underflow is observable
    /// instead of wrapping.
    outstanding: AtomicI64,
    /// Terminal gate. Set exactly once, by CAS.
    terminal: AtomicBool,
    inner: Mutex<BatchInner>,
    /// Deadline anchor: when the batch was started.
    started: Instant,
    done_tx: watch::Sender<DoneSlot>,
    callbacks: Mutex<Vec<DoneCallback>>,
    /// Abort handle of the armed timeout task, if any.
    timer: Mutex<Option<AbortHandle>>,
    metrics: Arc<CoordinatorMetrics>,
}

impl BatchState {
    pub(crate) fn new(total: usize, metrics: Arc<CoordinatorMetrics>) -> Arc<Self> {
        let (done_tx, _) = watch::channel(None);
        Arc::new(Self {
            total,
            outstanding: AtomicI64::new(total as i64),
            terminal: AtomicBool::new(false),
            inner: Mutex::new(BatchInner {
                pending: HashMap::with_capacity(total),
                entries: Vec::with_capacity(total),
            }),
            started: Instant::now(),
            done_tx,
            callbacks: Mutex::new(Vec::new()),
            timer: Mutex::new(None),
            metrics,
        })
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::Acquire)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<DoneSlot> {
        self.done_tx.subscribe()
    }

    /// Register the request as pending. Must happen before the dispatch
    /// that can produce a completion for the token.
    pub(crate) fn register(&self, record: RequestRecord) {
        lock(&self.inner).pending.insert(record.token, record);
    }

    /// Store the abort handle of the armed timeout task.
    pub(crate) fn set_timer(&self, handle: AbortHandle) {
        *lock(&self.timer) = Some(handle);
    }

    /// Record one completion outcome for `token`.
    ///
    /// Retires the pending record, appends the entry, and decrements the
    /// outstanding counter; the decrement that reaches zero finalizes the
    /// batch. Unknown tokens after the terminal point are late completions
    /// and are discarded; before it they poison the batch.
    pub(crate) fn record(
        self: &Arc<Self>,
        token: CorrelationToken,
        outcome_for: impl FnOnce(&RequestRecord) -> Outcome,
    ) {
        {
            let mut inner = lock(&self.inner);
            match inner.pending.remove(&token) {
                Some(record) => {
                    let outcome = outcome_for(&record);
                    match outcome {
                        Outcome::Success { .. } => self.metrics.inc_replies_recorded(),
                        Outcome::Failure { .. } => self.metrics.inc_failures_recorded(),
                        Outcome::TimedOut => {}
                    }
                    inner.entries.push(BatchEntry {
                        index: record.index,
                        token,
                        outcome,
                    });
                }
                None => {
                    drop(inner);
                    if self.is_terminal() {
                        self.metrics.inc_late_completions_discarded();
                        debug!(token = %token, "Late completion discarded");
                    } else {
                        self.poison(ConsistencyViolation::new(
                            token,
                            "completion for a token that is not outstanding",
                        ));
                    }
                    return;
                }
            }
        }

        let prev = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        if prev <= 0 {
            self.poison(ConsistencyViolation::new(
                token,
                format!("outstanding counter underflow ({} -> {})", prev, prev - 1),
            ));
        } else if prev == 1 {
            self.try_finalize(BatchStatus::Completed);
        }
    }

    /// Finalize the batch with `status` if it is not yet terminal.
    ///
    /// Returns true when this call won the terminal gate. On a timed-out
    /// finalization every still-pending request is retired as `TimedOut`;
    /// outcomes already recorded keep their value.
    pub(crate) fn try_finalize(self: &Arc<Self>, status: BatchStatus) -> bool {
        if self
            .terminal
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.disarm_timer();

        let result = {
            let mut inner = lock(&self.inner);
            if status == BatchStatus::TimedOut {
                for (token, record) in inner.pending.drain().collect::<Vec<_>>() {
                    inner.entries.push(BatchEntry {
                        index: record.index,
                        token,
                        outcome: Outcome::TimedOut,
                    });
                }
            }
            let mut entries = std::mem::take(&mut inner.entries);
            entries.sort_unstable_by_key(|e| e.index);
            Arc::new(BatchResult {
                status,
                entries,
                elapsed: self.started.elapsed(),
            })
        };

        match status {
            BatchStatus::Completed => {
                self.metrics.inc_batches_completed();
                info!(
                    requests = result.entries.len(),
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Batch completed"
                );
            }
            BatchStatus::TimedOut => {
                self.metrics.inc_batches_timed_out();
                warn!(
                    requests = result.entries.len(),
                    timed_out = result.timed_out_count(),
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Batch timed out"
                );
            }
        }

        // Publish first so a concurrently registering callback either lands
        // in the drain below or observes the published slot itself.
        // `send_replace` stores the value even while no receiver exists;
        // handles subscribing later still see it.
        self.done_tx.send_replace(Some(Ok(Arc::clone(&result))));

        let callbacks = std::mem::take(&mut *lock(&self.callbacks));
        for callback in callbacks {
            callback(&result);
        }

        true
    }

    /// Poison the batch with a correlation violation.
    ///
    /// Wins the terminal gate if still open; registered callbacks are
    /// dropped, waiters observe the violation.
    pub(crate) fn poison(self: &Arc<Self>, violation: ConsistencyViolation) {
        if self
            .terminal
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!(token = %violation.token, detail = %violation.detail, "Violation after terminal point");
            return;
        }

        self.disarm_timer();
        self.metrics.inc_batches_poisoned();
        error!(token = %violation.token, detail = %violation.detail, "Batch poisoned");

        self.done_tx.send_replace(Some(Err(violation)));
        lock(&self.callbacks).clear();
    }

    /// Register a callback to run on finalization.
    ///
    /// Runs inline when the batch is already done.
    pub(crate) fn on_done(&self, callback: DoneCallback) {
        let mut callbacks = lock(&self.callbacks);
        // Re-check under the lock: finalization publishes before draining,
        // so a published slot here means the drain will not pick us up.
        if let Some(Ok(result)) = self.done_tx.borrow().as_ref() {
            let result = Arc::clone(result);
            drop(callbacks);
            callback(&result);
            return;
        }
        if self.is_terminal() {
            // Poisoned batch: callbacks are dropped.
            return;
        }
        callbacks.push(callback);
    }

    /// Time remaining until `deadline` relative to the batch start.
    pub(crate) fn remaining(&self, timeout: Duration) -> Duration {
        timeout.saturating_sub(self.started.elapsed())
    }

    fn disarm_timer(&self) {
        // Best effort. The terminal gate makes a timer that already fired
        // harmless.
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::CorrelationToken;

    fn success(reply: &'static [u8]) -> impl FnOnce(&RequestRecord) -> Outcome {
        move |record| Outcome::Success {
            reply: Bytes::from_static(reply),
            latency: record.dispatched_at.elapsed(),
        }
    }

    #[tokio::test]
    async fn test_last_record_finalizes() {
        let state = BatchState::new(2, Arc::new(CoordinatorMetrics::new()));
        let t0 = CorrelationToken::mint();
        let t1 = CorrelationToken::mint();
        state.register(RequestRecord::new(t0, 0));
        state.register(RequestRecord::new(t1, 1));

        state.record(t0, success(b"a"));
        assert!(!state.is_terminal());

        state.record(t1, success(b"b"));
        assert!(state.is_terminal());

        let rx = state.subscribe();
        let slot = rx.borrow();
        let result = slot.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
        assert_eq!(result.entries.len(), 2);
        // Sorted by index regardless of recording order
        assert_eq!(result.entries[0].index, 0);
        assert_eq!(result.entries[1].index, 1);
    }

    #[tokio::test]
    async fn test_unknown_token_before_terminal_poisons() {
        let state = BatchState::new(1, Arc::new(CoordinatorMetrics::new()));
        state.register(RequestRecord::new(CorrelationToken::mint(), 0));

        state.record(CorrelationToken::mint(), success(b"?"));

        assert!(state.is_terminal());
        let rx = state.subscribe();
        assert!(rx.borrow().as_ref().unwrap().is_err());
        assert_eq!(state.metrics().batches_poisoned(), 1);
    }

    #[tokio::test]
    async fn test_late_completion_discarded() {
        let metrics = Arc::new(CoordinatorMetrics::new());
        let state = BatchState::new(1, Arc::clone(&metrics));
        let token = CorrelationToken::mint();
        state.register(RequestRecord::new(token, 0));

        // Deadline fires first
        assert!(state.try_finalize(BatchStatus::TimedOut));

        // The reply shows up afterwards: silently dropped
        state.record(token, success(b"too late"));

        assert_eq!(metrics.late_completions_discarded(), 1);
        assert_eq!(metrics.batches_poisoned(), 0);

        let rx = state.subscribe();
        let slot = rx.borrow();
        let result = slot.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(result.status, BatchStatus::TimedOut);
        assert_eq!(result.timed_out_count(), 1);
    }

    #[tokio::test]
    async fn test_double_finalize_single_winner() {
        let state = BatchState::new(1, Arc::new(CoordinatorMetrics::new()));
        state.register(RequestRecord::new(CorrelationToken::mint(), 0));

        assert!(state.try_finalize(BatchStatus::TimedOut));
        assert!(!state.try_finalize(BatchStatus::Completed));

        let rx = state.subscribe();
        let slot = rx.borrow();
        let result = slot.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(result.status, BatchStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_timed_out_keeps_recorded_outcomes() {
        let state = BatchState::new(3, Arc::new(CoordinatorMetrics::new()));
        let tokens: Vec<_> = (0..3)
            .map(|i| {
                let t = CorrelationToken::mint();
                state.register(RequestRecord::new(t, i));
                t
            })
            .collect();

        state.record(tokens[1], success(b"mid"));
        state.try_finalize(BatchStatus::TimedOut);

        let rx = state.subscribe();
        let slot = rx.borrow();
        let result = slot.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(result.status, BatchStatus::TimedOut);
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.timed_out_count(), 2);
        assert!(result.entries[1].outcome.is_success());
    }

    #[tokio::test]
    async fn test_result_visible_to_late_subscriber() {
        let state = BatchState::new(0, Arc::new(CoordinatorMetrics::new()));

        // No receiver exists at finalization time
        assert!(state.try_finalize(BatchStatus::Completed));

        // A subscription taken afterwards must still observe the slot
        let rx = state.subscribe();
        let slot = rx.borrow();
        let result = slot.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_poison_visible_to_late_subscriber() {
        let state = BatchState::new(1, Arc::new(CoordinatorMetrics::new()));
        state.register(RequestRecord::new(CorrelationToken::mint(), 0));

        state.poison(ConsistencyViolation::new(
            CorrelationToken::mint(),
            "completion for a token that is not outstanding",
        ));

        let rx = state.subscribe();
        assert!(rx.borrow().as_ref().unwrap().is_err());
    }

    #[tokio::test]
    async fn test_on_done_after_finalize_runs_inline() {
        let state = BatchState::new(0, Arc::new(CoordinatorMetrics::new()));
        state.try_finalize(BatchStatus::Completed);

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        state.on_done(Box::new(move |result| {
            assert_eq!(result.status, BatchStatus::Completed);
            flag.store(true, Ordering::SeqCst);
        }));

        assert!(fired.load(Ordering::SeqCst));
    }
}
