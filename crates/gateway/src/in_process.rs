//! In-process gateway implementation
//!
//! Implements `RequestGateway` against handlers registered in the same
//! process, with simulated reply latency and optional fault injection.
//! Used for testing and load runs without an external message broker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, trace};

use contracts::{Completion, CompletionCallback, ContractError, CorrelationToken, EndpointId};

use crate::fault::{FaultDecision, FaultProfile};

/// Endpoint request handler: payload in, reply (or remote failure) out.
pub type EndpointHandler = Arc<dyn Fn(&Bytes) -> Result<Bytes, String> + Send + Sync>;

/// Gateway backed by in-process handlers.
///
/// Each accepted dispatch is served on a spawned task after a uniformly
/// sampled latency, so completions arrive out of order and on arbitrary
/// worker threads, like replies from a real broker. Requires a Tokio
/// runtime.
pub struct InProcessGateway {
    endpoints: HashMap<EndpointId, EndpointHandler>,
    latency_min: Duration,
    latency_max: Duration,
    faults: FaultProfile,
}

impl InProcessGateway {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            latency_min: Duration::ZERO,
            latency_max: Duration::ZERO,
            faults: FaultProfile::default(),
        }
    }

    /// Set the uniform reply latency window.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.latency_min = min;
        self.latency_max = max;
        self
    }

    /// Set the fault injection profile.
    pub fn with_faults(mut self, faults: FaultProfile) -> Self {
        self.faults = faults;
        self
    }

    /// Register a handler for `id`, replacing any previous one.
    pub fn register(&mut self, id: EndpointId, handler: EndpointHandler) {
        self.endpoints.insert(id, handler);
    }

    /// Register a plain closure for `id`.
    pub fn register_fn<F>(&mut self, id: impl Into<EndpointId>, handler: F)
    where
        F: Fn(&Bytes) -> Result<Bytes, String> + Send + Sync + 'static,
    {
        self.register(id.into(), Arc::new(handler));
    }

    /// Registered endpoint ids.
    pub fn endpoint_ids(&self) -> impl Iterator<Item = &EndpointId> {
        self.endpoints.keys()
    }

    fn sample_latency(&self) -> Duration {
        if self.latency_max <= self.latency_min {
            return self.latency_min;
        }
        let min = self.latency_min.as_micros() as u64;
        let max = self.latency_max.as_micros() as u64;
        Duration::from_micros(rand::rng().random_range(min..=max))
    }
}

impl Default for InProcessGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl contracts::RequestGateway for InProcessGateway {
    fn dispatch(
        &self,
        destination: &EndpointId,
        payload: Bytes,
        token: CorrelationToken,
        on_complete: CompletionCallback,
    ) -> Result<(), ContractError> {
        let handler = self
            .endpoints
            .get(destination)
            .ok_or_else(|| ContractError::unknown_destination(destination.as_str()))?;

        match self.faults.decide(&mut rand::rng()) {
            FaultDecision::Reject => {
                return Err(ContractError::dispatch_rejected(
                    destination.as_str(),
                    "injected broker rejection",
                ));
            }
            FaultDecision::Drop => {
                // Accepted but never answered; the caller's deadline covers it.
                debug!(token = %token, destination = %destination, "Dispatch accepted, reply dropped");
                return Ok(());
            }
            FaultDecision::Fail => {
                let latency = self.sample_latency();
                tokio::spawn(async move {
                    sleep(latency).await;
                    on_complete(Completion::Failure("injected remote failure".into()));
                });
                return Ok(());
            }
            FaultDecision::Deliver => {}
        }

        let latency = self.sample_latency();
        let handler = Arc::clone(handler);
        let destination = destination.clone();
        tokio::spawn(async move {
            sleep(latency).await;
            trace!(token = %token, destination = %destination, "Serving request");
            match handler(&payload) {
                Ok(reply) => on_complete(Completion::Reply(reply)),
                Err(error) => on_complete(Completion::Failure(error)),
            }
        });

        Ok(())
    }
}
