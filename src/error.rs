// Error types for the reporting core

use crate::listener::ListenerState;

/// Result alias used by the lifecycle API.
pub type Result<T> = std::result::Result<T, Error>;

/// Faults raised by the reporting core itself.
///
/// Test outcomes (failures, errors) are data and never show up here. Only
/// caller defects and infrastructure problems do.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lifecycle method was called out of order by the driving collaborator.
    #[error("`{operation}` is not valid while the listener is {state}")]
    LifecycleViolation {
        operation: &'static str,
        state: ListenerState,
    },

    #[error("output range {offset}..{offset}+{length} exceeds buffer of {available} bytes")]
    InvalidOutputRange {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for out-of-order lifecycle calls.
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Error::LifecycleViolation { .. })
    }
}
