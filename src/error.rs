//! Error types for the Evia client core.

use std::time::Duration;

/// Top-level error type for the client core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Request error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while compiling a declarative schema description.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid pattern for field {field}: {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Cross-field rule on {field} references unknown field {other}")]
    UnknownField { field: String, other: String },

    #[error("Failed to parse schema description: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Remote or transport failures for a single request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to reach {uri}: {reason}")]
    Connect { uri: String, reason: String },

    #[error("Request to {uri} timed out after {timeout:?}")]
    Timeout { uri: String, timeout: Duration },

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Invalid response from {uri}: {reason}")]
    InvalidResponse { uri: String, reason: String },
}

/// Secure credential storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Secure store write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Secure store read failed for key {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the client core.
pub type Result<T> = std::result::Result<T, Error>;
