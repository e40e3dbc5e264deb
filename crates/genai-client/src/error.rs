//! Error types for the API client.

use thiserror::Error;

use genai_core::CoreError;

/// Errors that can occur when talking to the GenAI platform API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status} from {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The call needs a signed-in session and there is none.
    #[error("not signed in; run `genai login` first")]
    NotAuthenticated,

    /// Rejected locally before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persisted credentials could not be read or written.
    #[error("credential store error: {0}")]
    Credentials(String),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background poll task panicked or was aborted.
    #[error("background task failed: {0}")]
    Background(String),
}

impl From<CoreError> for ClientError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
        }
    }
}

impl ClientError {
    /// Returns true if the service rejected the request with 401/403.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}
