//! Core data model types for examflow.
//!
//! These are the fundamental types the whole system uses to represent
//! exams, questions, answers, and the lifecycle of one attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete exam definition, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    /// Unique identifier for this exam.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Description shown before the attempt starts.
    #[serde(default)]
    pub description: String,
    /// Total duration of the attempt in seconds.
    pub duration_secs: u64,
    /// Ordered question list.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl ExamDefinition {
    /// Position of a question in the ordered list, if present.
    pub fn question_index(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }
}

/// A single question, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the exam.
    pub id: String,
    /// Prompt text shown to the student.
    pub prompt: String,
    /// Question kind with kind-specific payload.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Supported question kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Exactly one choice may be selected.
    SingleChoice { choices: Vec<Choice> },
    /// Free-form text answer.
    FreeText,
}

/// One selectable choice of a single-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Identifier sent back as the answer value.
    pub id: String,
    /// Display text.
    pub text: String,
}

/// The value of one captured answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerValue {
    /// A choice id for a single-choice question.
    Choice(String),
    /// Free text for a free-text question.
    Text(String),
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Choice(id) => write!(f, "choice:{id}"),
            AnswerValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// A captured answer with its local revision.
///
/// At most one answer exists per question; a later edit overwrites the
/// prior value and bumps the revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
    /// Local, monotonically increasing edit counter for this question.
    pub revision: u64,
}

/// Server-issued identifier for an in-progress attempt.
///
/// Obtained once at `begin()` and required on every save and on final
/// submission. The server-reported start timestamp anchors the
/// countdown clock so remaining time survives process suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptHandle {
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,
}

/// Receipt returned by the persistence service on finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationReceipt {
    pub attempt_id: String,
    /// Number of answers the server recorded.
    pub received_answers: usize,
    pub completed_at: DateTime<Utc>,
}

/// Lifecycle state of one exam session. Exactly one per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Loading,
    Active,
    Submitting,
    Completed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "not_started"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::Active => write!(f, "active"),
            SessionState::Submitting => write!(f, "submitting"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}
