//! Service trait definitions for the exam backend.
//!
//! These async traits are the seams between the session engine and the
//! remote backend; the `examflow-providers` crate implements them over
//! HTTP and over local files. Both are black-box calls with latency and
//! failure possibility — the engine never blocks the timer or
//! navigation on them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerValue, AttemptHandle, ConfirmationReceipt, ExamDefinition};

/// Result of starting a server-side attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptStart {
    /// Handle required on every subsequent save and on finalization.
    pub handle: AttemptHandle,
    /// When present, a possibly reordered or regenerated question set
    /// the engine must adopt as authoritative for the session.
    #[serde(default)]
    pub exam: Option<ExamDefinition>,
}

/// Acknowledgement of one background answer save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAck {
    pub question_id: String,
    /// The local revision this acknowledgement belongs to. Stale
    /// revisions are discarded by the caller.
    pub revision: u64,
}

/// Fetches exam content and starts server-side attempts.
#[async_trait]
pub trait ExamContentProvider: Send + Sync {
    /// Fetch the exam definition shown before the attempt starts.
    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition>;

    /// Create the server-side attempt and obtain its handle.
    async fn start_attempt(&self, exam_id: &str) -> anyhow::Result<AttemptStart>;
}

/// Durably records answers and finalizes a submission.
#[async_trait]
pub trait AnswerPersistence: Send + Sync {
    /// Record one answer. Called fire-and-forget by the engine; a
    /// failure is a non-fatal notice, never a session error.
    async fn save_answer(
        &self,
        handle: &AttemptHandle,
        question_id: &str,
        value: &AnswerValue,
        revision: u64,
    ) -> anyhow::Result<SaveAck>;

    /// Finalize the attempt with the full answer snapshot. Called at
    /// most once per attempt by the submission coordinator.
    async fn finalize_attempt(
        &self,
        handle: &AttemptHandle,
        answers: &[Answer],
    ) -> anyhow::Result<ConfirmationReceipt>;
}
