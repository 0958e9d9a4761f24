//! # Fanout
//!
//! Fan-out/fan-in batch coordination.
//!
//! Responsibilities:
//! - Dispatch N correlated requests over a [`contracts::RequestGateway`]
//! - Count completions race-free and finalize exactly once
//! - Enforce the aggregate batch deadline
//! - Expose the result through a [`CompletionHandle`]

mod batch;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sink;
mod timeout;

pub use contracts::{BatchResult, BatchStatus, Completion, Outcome, RequestGateway};
pub use coordinator::{BatchSpec, FanOutCoordinator};
pub use error::{ConsistencyViolation, FanoutError};
pub use handle::CompletionHandle;
pub use metrics::{CoordinatorMetrics, MetricsSnapshot};
pub use sink::ResultSink;
