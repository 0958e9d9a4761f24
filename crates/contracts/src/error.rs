//! Layered error definitions
//!
//! Categorized by source: config / gateway / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Gateway Errors =====
    /// The gateway refused the dispatch synchronously
    #[error("dispatch to '{destination}' rejected: {message}")]
    DispatchRejected {
        destination: String,
        message: String,
    },

    /// No endpoint is registered for the destination
    #[error("unknown destination: {destination}")]
    UnknownDestination { destination: String },

    /// The gateway has shut down and accepts no further dispatches
    #[error("gateway closed")]
    GatewayClosed,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create dispatch rejection error
    pub fn dispatch_rejected(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DispatchRejected {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create unknown destination error
    pub fn unknown_destination(destination: impl Into<String>) -> Self {
        Self::UnknownDestination {
            destination: destination.into(),
        }
    }
}
