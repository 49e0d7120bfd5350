//! Error types shared across the mining engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Not enough evidence to proceed. This is the expected outcome for
    /// sparse data and is usually handled by emitting nothing.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Malformed or out-of-range input.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A single detector failed; the rest of the pipeline continues.
    #[error("Detector '{name}' failed: {message}")]
    Detector { name: String, message: String },

    /// Storage/transport failure from the event store or repository.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A mining run was requested while another run holds the run lock.
    #[error("A mining run is already in progress")]
    JobAlreadyRunning,

    /// Invariant or input validation failure.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Wrap a detector failure, keeping the detector name for the report.
    pub fn detector(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Detector {
            name: name.into(),
            message: message.into(),
        }
    }
}
