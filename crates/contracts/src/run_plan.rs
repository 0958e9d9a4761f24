//! RunPlan - declarative configuration for a fan-out run
//!
//! Parsed from TOML/JSON by `config_loader`, consumed by the CLI to build a
//! gateway and drive batches through the coordinator.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::EndpointId;

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunPlan {
    /// Batch shape and deadline.
    #[validate(nested)]
    pub batch: BatchSettings,

    /// Simulated gateway behavior.
    #[serde(default)]
    #[validate(nested)]
    pub gateway: GatewaySettings,
}

/// Shape of the batches to issue.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchSettings {
    /// Destination endpoint the requests are dispatched to.
    pub destination: EndpointId,

    /// Requests per batch.
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,

    /// Number of batches to run.
    #[serde(default = "default_batches")]
    pub batches: u64,

    /// Aggregate deadline per batch, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1, message = "timeout_ms must be >= 1"))]
    pub timeout_ms: u64,

    /// Batches in flight at once.
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, message = "concurrency must be >= 1"))]
    pub concurrency: usize,
}

fn default_fan_out() -> usize {
    10
}

fn default_batches() -> u64 {
    1
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_concurrency() -> usize {
    1
}

/// Behavior of the in-process gateway backing the run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewaySettings {
    /// Endpoints to register.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,

    /// Lower bound of the simulated reply latency, in milliseconds.
    #[serde(default)]
    pub latency_min_ms: u64,

    /// Upper bound of the simulated reply latency, in milliseconds.
    #[serde(default = "default_latency_max_ms")]
    pub latency_max_ms: u64,

    /// Probability of a synchronous dispatch rejection.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0, message = "reject_rate must be in [0, 1]"))]
    pub reject_rate: f64,

    /// Probability of an asynchronous remote failure.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0, message = "failure_rate must be in [0, 1]"))]
    pub failure_rate: f64,

    /// Probability that an accepted request never completes.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0, message = "drop_rate must be in [0, 1]"))]
    pub drop_rate: f64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            latency_min_ms: 0,
            latency_max_ms: default_latency_max_ms(),
            reject_rate: 0.0,
            failure_rate: 0.0,
            drop_rate: 0.0,
        }
    }
}

fn default_latency_max_ms() -> u64 {
    20
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![EndpointConfig {
        id: "simple.echo".into(),
        kind: EndpointKind::Echo,
    }]
}

/// A single endpoint registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint id, the dispatch destination.
    pub id: EndpointId,

    /// Built-in handler to attach.
    #[serde(default)]
    pub kind: EndpointKind,
}

/// Built-in endpoint handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Reply with the processed request body and its character count.
    #[default]
    Echo,
    /// Reply with the request body uppercased.
    Uppercase,
}
