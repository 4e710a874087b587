//! Error types for the carver toolkit.
//!
//! This module defines a unified error enum that covers the error categories
//! shared across crates: configuration, I/O, LLM transport, prompt rendering,
//! splitting, and serialization. The splitter crate carries its own richer
//! error types (phase, offset, committed prefix) and converts into this enum
//! at the crate boundary.

use thiserror::Error;

/// Unified error type for the carver toolkit.
///
/// All fallible functions outside the splitter's hot path return
/// `Result<T, CarverError>`. We never panic — errors must be represented
/// and propagated.
#[derive(Error, Debug)]
pub enum CarverError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt rendering / protocol errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Document splitting errors
    #[error("Split error: {0}")]
    Split(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for CarverError {
    fn from(err: serde_json::Error) -> Self {
        CarverError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CarverError {
    fn from(err: serde_yaml::Error) -> Self {
        CarverError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with CarverError.
pub type CarverResult<T> = Result<T, CarverError>;
