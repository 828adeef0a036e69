//! Error types for the submission adapter

use thiserror::Error;

/// Result type alias using the adapter Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the submission adapter
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors, raised before any cluster call
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    // Cluster errors
    #[error("Submission of {job_id} rejected: {message}")]
    Submission { job_id: String, message: String },

    #[error("Status unavailable for {job_id}: {message}")]
    TransientStatus { job_id: String, message: String },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    // Timeout errors
    #[error("Operation timeout: {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransientStatus { .. } | Error::JobNotFound { .. } | Error::Timeout { .. }
        )
    }

    /// Returns true if this error indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::Internal { .. }
        )
    }

    /// Returns a retry delay hint in milliseconds, if applicable
    pub fn retry_delay_hint_ms(&self) -> Option<u64> {
        match self {
            Error::TransientStatus { .. } => Some(1000),
            Error::JobNotFound { .. } => Some(2000),
            Error::Timeout { .. } => Some(1000),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
