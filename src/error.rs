//! Error types for the bridge.
//!
//! Only update-primitive failures and completion outcomes surface as errors.
//! Lookup misses and handler faults are logged at the point they happen.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the bridge's fallible operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A required argument was missing or did not point at a usable location.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The same element id occurs more than once inside one node's data tree.
    #[error("duplicate element id `{element_id}` in node data")]
    DuplicateElementId { element_id: String },

    /// No matching store notification arrived before the deadline.
    #[error("timed out after {timeout:?} waiting for `{property}` on element `{element_id}`")]
    Timeout {
        element_id: String,
        property: String,
        timeout: Duration,
    },

    /// The store went away while a completion was still pending.
    #[error("store dropped before the update for element `{element_id}` completed")]
    Shutdown { element_id: String },
}

impl BridgeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether this is the completion protocol's timeout outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
