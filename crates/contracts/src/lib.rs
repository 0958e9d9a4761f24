//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Correlation Model
//! - Every outstanding request carries a [`CorrelationToken`], unique for the
//!   lifetime of its batch
//! - Replies are routed back to their logical slot by token, never by arrival order

mod endpoint_id;
mod error;
mod gateway;
mod outcome;
mod request;
mod run_plan;
mod token;

pub use endpoint_id::EndpointId;
pub use error::*;
pub use gateway::{Completion, CompletionCallback, RequestGateway};
pub use outcome::*;
pub use request::RequestRecord;
pub use run_plan::*;
pub use token::CorrelationToken;
