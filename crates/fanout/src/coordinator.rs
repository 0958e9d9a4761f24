//! FanOutCoordinator - initiates request batches and wires up completion

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, instrument, warn};

use contracts::{BatchStatus, Completion, EndpointId, RequestGateway, RequestRecord};

use crate::batch::BatchState;
use crate::handle::CompletionHandle;
use crate::metrics::CoordinatorMetrics;
use crate::sink::ResultSink;
use crate::timeout;

/// Shape of one batch: where to send, how many, how long to wait.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    /// Destination endpoint for every request in the batch.
    pub destination: EndpointId,
    /// Number of requests to dispatch.
    pub count: usize,
    /// Aggregate deadline, anchored at batch start.
    pub timeout: Duration,
}

/// Coordinates fan-out batches over a gateway.
///
/// The coordinator owns no per-batch state; each `start` call creates a
/// fresh batch whose bookkeeping lives behind the returned handle. One
/// coordinator can run any number of batches concurrently.
pub struct FanOutCoordinator<G> {
    gateway: Arc<G>,
    metrics: Arc<CoordinatorMetrics>,
}

impl<G: RequestGateway> FanOutCoordinator<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            metrics: Arc::new(CoordinatorMetrics::new()),
        }
    }

    /// Cumulative counters across all batches started here.
    pub fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    /// Start a batch: dispatch `spec.count` requests built by
    /// `request_builder` and return a handle to the eventual result.
    ///
    /// The full count is committed to the outstanding counter before the
    /// first dispatch, so an early completion can never observe a
    /// half-started batch. Synchronous rejections are folded in as
    /// failures on the spot; an empty batch finalizes immediately.
    ///
    /// Must be called within a Tokio runtime (the deadline timer is a
    /// spawned task).
    #[instrument(
        name = "coordinator_start_batch",
        skip(self, request_builder),
        fields(destination = %spec.destination, count = spec.count)
    )]
    pub fn start(
        &self,
        spec: &BatchSpec,
        mut request_builder: impl FnMut(usize) -> Bytes,
    ) -> CompletionHandle {
        let state = BatchState::new(spec.count, Arc::clone(&self.metrics));
        self.metrics.inc_batches_started();

        if spec.count == 0 {
            state.try_finalize(BatchStatus::Completed);
            return CompletionHandle::new(state);
        }

        let sink = ResultSink::new(Arc::clone(&state));
        info!(
            timeout_ms = spec.timeout.as_millis() as u64,
            "Dispatching batch"
        );

        for index in 0..spec.count {
            let record = RequestRecord::new(contracts::CorrelationToken::mint(), index);
            let token = record.token;
            // Pending before dispatch: the completion may beat the loop.
            state.register(record);

            let payload = request_builder(index);
            let completion_sink = sink.clone();
            let outcome = self.gateway.dispatch(
                &spec.destination,
                payload,
                token,
                Box::new(move |completion| completion_sink.record(token, completion)),
            );

            if let Err(rejection) = outcome {
                self.metrics.inc_rejections_recorded();
                warn!(
                    index,
                    token = %token,
                    error = %rejection,
                    "Dispatch rejected, folding into batch as failure"
                );
                sink.record(token, Completion::Failure(rejection.to_string()));
            }
        }

        // Armed only once every request is issued, so a deadline elapsing
        // during a slow dispatch loop cannot finalize a half-registered
        // batch. Still anchored at the start instant; arm() skips if the
        // batch already finalized inline.
        timeout::arm(&state, spec.timeout);

        CompletionHandle::new(state)
    }
}
