//! CorrelationToken - opaque per-request identifier
//!
//! Links a dispatched request to its eventual reply. Unique within a batch's
//! lifetime; never reused while the batch is open.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, unique identifier minted per outstanding request.
///
/// Backed by a v4 UUID so tokens are unique across concurrent batches as
/// well, which lets a shared gateway route completions without any
/// batch-scoped namespace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Mint a fresh token.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationToken({})", self.0)
    }
}
