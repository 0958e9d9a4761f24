//! RequestGateway trait - asynchronous request/reply boundary
//!
//! Abstracts the external message-driven service framework: a dispatch is
//! accepted (or rejected) synchronously, and at most one completion event is
//! delivered later on an unspecified worker thread.

use bytes::Bytes;

use crate::{ContractError, CorrelationToken, EndpointId};

/// What the remote service eventually produced for one request.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The endpoint replied with a payload.
    Reply(Bytes),
    /// The gateway delivered an asynchronous failure for this request.
    Failure(String),
}

/// Completion callback, invoked at most once per accepted dispatch.
///
/// `FnOnce` encodes the at-most-once contract in the type: a conforming
/// gateway cannot deliver the same completion twice.
pub type CompletionCallback = Box<dyn FnOnce(Completion) + Send + 'static>;

/// Asynchronous request gateway trait.
///
/// Implementations deliver completions on arbitrary worker threads, in
/// arbitrary order relative to dispatch order. The only causal guarantee the
/// caller relies on is that `on_complete` runs strictly after `dispatch`
/// returned `Ok`.
///
/// # Contract
///
/// 1. **Synchronous verdict**: `dispatch` returns `Err` if and only if the
///    request was not accepted; in that case `on_complete` is never invoked.
/// 2. **At-most-once**: an accepted dispatch invokes `on_complete` at most
///    once. Zero invocations are permitted (a lost reply); the caller guards
///    against that with its own deadline.
/// 3. **Non-blocking**: `dispatch` must return in bounded, small time; it
///    must not wait for the reply.
pub trait RequestGateway: Send + Sync {
    /// Dispatch `payload` to `destination`, tagged with `token`.
    ///
    /// # Errors
    /// Returns a rejection (unknown destination, saturation, ...) when the
    /// request could not be accepted.
    fn dispatch(
        &self,
        destination: &EndpointId,
        payload: Bytes,
        token: CorrelationToken,
        on_complete: CompletionCallback,
    ) -> Result<(), ContractError>;
}
