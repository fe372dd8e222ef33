//! Error types for clipvault.

use thiserror::Error;

/// Result type alias using clipvault's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for clipvault operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid caller input (empty capture text, bad limit, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed credentials/configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success HTTP response from a remote dependency
    #[error("Remote service error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// Embedding response shape not recognized
    #[error("Unexpected embedding format: {0}")]
    UnexpectedFormat(String),

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed before a response was received
    #[error("Request error: {0}")]
    Request(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `Remote` error from a response status and body.
    pub fn remote(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Error::Remote {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// Short, human-readable message suitable for surfacing to the user.
    ///
    /// Distinguishes the failure classes a capture UI needs to present
    /// differently; the full error remains available via `Display`.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(_) => "No content to save".to_string(),
            Error::Config(_) => "Service not configured".to_string(),
            Error::Remote { status, .. } => {
                format!("Remote service rejected the request ({})", status)
            }
            Error::Request(_) => "Could not reach remote service".to_string(),
            Error::UnexpectedFormat(_) => "Remote service returned unusable data".to_string(),
            Error::Storage(_) | Error::Io(_) => "Could not write to local storage".to_string(),
            Error::Serialization(_) => "Could not read saved data".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
