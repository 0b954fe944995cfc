//! Transport error types.
//!
//! These represent failures when talking to the exam backend. They are
//! typed (rather than stringly) so callers can downcast through the
//! anyhow boundary and classify failures without string matching.

use thiserror::Error;

/// Errors that can occur when calling the exam backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid or expired token).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested exam does not exist.
    #[error("exam not found: {0}")]
    ExamNotFound(String),

    /// The attempt handle is unknown to the server.
    #[error("attempt not found: {0}")]
    AttemptNotFound(String),

    /// The attempt was already finalized; no further writes accepted.
    #[error("attempt already closed: {0}")]
    AttemptClosed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),
}

impl TransportError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            TransportError::AuthenticationFailed(_)
                | TransportError::ExamNotFound(_)
                | TransportError::AttemptNotFound(_)
                | TransportError::AttemptClosed(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            TransportError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
