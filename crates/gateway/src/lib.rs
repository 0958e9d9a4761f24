//! # Gateway
//!
//! `RequestGateway` implementations.
//!
//! - [`InProcessGateway`]: serves registered handlers on spawned tasks with
//!   simulated latency and fault injection
//! - [`ManualGateway`]: holds dispatches for tests to complete by hand

mod fault;
mod in_process;
mod manual;

pub use contracts::RequestGateway;
pub use fault::FaultProfile;
pub use in_process::{EndpointHandler, InProcessGateway};
pub use manual::ManualGateway;
