//! Session error taxonomy.
//!
//! Load and start failures are terminal for the attempt; submit
//! failures are retryable with the captured answers preserved. The
//! contract-violation variants (`InvalidStateTransition`, `OutOfRange`,
//! `NotLast`, `UnknownQuestion`) are programmer-facing, not user-facing.
//! Save failures never appear here — they travel through the
//! `SessionObserver` as non-fatal notices.

use thiserror::Error;

use crate::model::SessionState;

/// Errors surfaced by the session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Fetching the exam definition failed. Terminal for this attempt.
    #[error("failed to load exam '{exam_id}': {cause:#}")]
    Load {
        exam_id: String,
        cause: anyhow::Error,
    },

    /// Creating the server-side attempt failed. Terminal for this attempt.
    #[error("failed to start attempt for exam '{exam_id}': {cause:#}")]
    Start {
        exam_id: String,
        cause: anyhow::Error,
    },

    /// Finalizing the attempt failed. Answers are retained and
    /// `submit()` may be called again.
    #[error("failed to submit attempt: {cause:#}")]
    Submit { cause: anyhow::Error },

    /// The operation is not valid in the current session state.
    #[error("{action} is not valid in state {state}")]
    InvalidStateTransition {
        state: SessionState,
        action: &'static str,
    },

    /// `go_to` target outside the question interval.
    #[error("question index {index} out of range (question count: {len})")]
    OutOfRange { index: usize, len: usize },

    /// Explicit submission requested while not on the last question.
    #[error("cannot submit from question index {index}: not on the last question")]
    NotLast { index: usize },

    /// Answer for a question id the exam does not contain.
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),
}

impl SessionError {
    /// Returns `true` if the session may retry `submit()` after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Submit { .. })
    }
}
