//! Error types for StarLine client operations

use std::fmt;

use thiserror::Error;

/// Result type alias for StarLine client operations
pub type Result<T> = std::result::Result<T, StarlineError>;

/// Why an authentication attempt ended in the failed state.
///
/// Stored inside the session so callers polling `is_failed()` can retrieve
/// the detail later; cloned out on every read.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthFailure {
    /// Network or HTTP-level failure, rendered to a message
    Transport(String),
    /// Well-formed vendor response whose success predicate failed;
    /// carries the raw response body
    Rejected(serde_json::Value),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::Transport(message) => write!(f, "transport failure: {message}"),
            AuthFailure::Rejected(body) => write!(f, "vendor rejected credentials: {body}"),
        }
    }
}

/// Errors that can occur during StarLine client operations
#[derive(Error, Debug)]
pub enum StarlineError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server returned a non-success HTTP status
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: serde_json::Value },

    /// Vendor answered 2xx but the payload indicates failure
    #[error("Vendor rejected request: {0}")]
    Rejected(serde_json::Value),

    /// The session handshake ended in the failed state
    #[error("Authentication failed: {0}")]
    AuthFailed(AuthFailure),

    /// An authenticated endpoint was invoked before the session was ready
    #[error("Session is not ready")]
    NotReady,

    /// Failed to parse a response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Readiness wait deadline exceeded
    #[error("Timed out waiting for session readiness")]
    Timeout,
}

impl StarlineError {
    /// Create a server error from status code and response body
    pub fn server_error(status: u16, body: serde_json::Value) -> Self {
        Self::Server { status, body }
    }
}
