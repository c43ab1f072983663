//! Platform error types

use thiserror::Error;

/// Errors raised by UI-side collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The executor no longer accepts work (its thread has exited)
    #[error("UI executor is closed")]
    ExecutorClosed,

    /// Failed to spawn the executor thread
    #[error("Failed to spawn UI executor thread: {0}")]
    ExecutorSpawn(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
