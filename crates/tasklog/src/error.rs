//! Logging setup error types.

use thiserror::Error;

/// Errors that can occur while configuring or installing logging.
///
/// Environment-derived input never produces these; only explicitly named
/// values (CLI flags, filter directives) and subscriber installation do.
#[derive(Debug, Error)]
pub enum LogError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Initialization error.
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Result type for logging operations.
pub type LogResult<T> = Result<T, LogError>;
