//! Error types for the ProcureX backend client.
//!
//! [`BackendError`] covers the three ways a request to the analysis service
//! can go wrong: the service answered with a non-success status, the
//! transport failed, or the body could not be decoded.

use thiserror::Error;

/// Errors that can occur while talking to the analysis backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success HTTP status.
    /// `message` is the FastAPI `detail` when present, otherwise the raw body.
    #[error("backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Decode(String),
}
