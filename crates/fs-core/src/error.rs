//! Error types for the file-system manager

use thiserror::Error;

/// Result type alias using the manager Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by adapters, the registry and the read pipeline
///
/// Expected read outcomes (missing file, directory, not modified) are not
/// errors; they are reported through the read result code.
#[derive(Error, Debug)]
pub enum Error {
    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Storage backend not available: {backend}")]
    StorageUnavailable { backend: String },

    #[error("Storage path not found: {path}")]
    StoragePathNotFound { path: String },

    #[error("Content is not valid UTF-8: {path}")]
    InvalidEncoding { path: String },

    // Registry errors
    #[error("No connection configured for key: {key}")]
    ConnectionNotFound { key: String },

    #[error("No adapter registered for type '{adapter_type}' (connection {key})")]
    UnknownAdapterType { key: String, adapter_type: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Timeout errors
    #[error("Operation timeout: {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },
}

impl Error {
    /// Returns true if this error reports a missing path
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::StoragePathNotFound { .. } => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true if this error comes from a misconfigured connection
    /// rather than from a backend call
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Error::ConnectionNotFound { .. }
                | Error::UnknownAdapterType { .. }
                | Error::InvalidConfig { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
