//! Error types for nudge.

use thiserror::Error;

/// Common error type for nudge.
#[derive(Error, Debug)]
pub enum NudgeError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for nudge operations.
pub type Result<T> = std::result::Result<T, NudgeError>;
