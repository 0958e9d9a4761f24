//! Fan-out error types

use contracts::CorrelationToken;
use thiserror::Error;

/// Correlation bookkeeping was violated.
///
/// Raised when a completion arrives for a token that is not outstanding
/// while the batch is still live, or when the outstanding counter goes
/// below zero. Either means the gateway broke its at-most-once contract;
/// the batch is poisoned and publishes this instead of a result.
#[derive(Debug, Clone, Error)]
#[error("correlation violation for token {token}: {detail}")]
pub struct ConsistencyViolation {
    /// Token the offending completion carried.
    pub token: CorrelationToken,
    /// What went wrong.
    pub detail: String,
}

impl ConsistencyViolation {
    pub fn new(token: CorrelationToken, detail: impl Into<String>) -> Self {
        Self {
            token,
            detail: detail.into(),
        }
    }
}

/// Fan-out specific errors
#[derive(Debug, Error)]
pub enum FanoutError {
    /// The batch was poisoned by a correlation violation
    #[error("batch poisoned: {0}")]
    Consistency(#[from] ConsistencyViolation),

    /// A caller-supplied wait limit elapsed before the batch finalized
    #[error("wait limit elapsed before the batch finalized")]
    WaitDeadline,

    /// The batch state was dropped before a result was published
    #[error("batch dropped before a result was published")]
    Abandoned,

    /// Error from the gateway contract
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}
