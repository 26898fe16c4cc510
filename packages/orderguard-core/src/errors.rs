//! Error types for orderguard-core
//!
//! Loading inputs (programs, protocols, configuration) can fail; analysis
//! itself cannot. Rule breaches are reported as `Violation` values.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::typestate::infrastructure::ParseError;

/// Main error type for orderguard-core operations
#[derive(Debug, Error)]
pub enum OrderguardError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed program IR
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol definition or order expression could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Protocol registry error (duplicate or invalid protocol)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl OrderguardError {
    /// Create a protocol registry error
    pub fn protocol(msg: impl Into<String>) -> Self {
        OrderguardError::Protocol(msg.into())
    }
}

/// Result type alias for orderguard operations
pub type Result<T> = std::result::Result<T, OrderguardError>;
