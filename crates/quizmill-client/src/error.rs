//! Backend error types.

use thiserror::Error;

/// Errors that can occur when talking to the evaluation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend sent a payload that failed validation.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
