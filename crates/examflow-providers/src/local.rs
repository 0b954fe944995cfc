//! Local exam service for offline runs and testing.
//!
//! Serves exams from memory (optionally loaded from TOML files on
//! disk), issues uuid attempt handles, and records saves and
//! finalizations in memory. Failure injection and call counters make it
//! the standard test double for the session engine.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use examflow_core::model::{
    Answer, AnswerValue, AttemptHandle, ConfirmationReceipt, ExamDefinition,
};
use examflow_core::parser;
use examflow_core::traits::{AnswerPersistence, AttemptStart, ExamContentProvider, SaveAck};

use crate::error::TransportError;

/// One answer save as the service received it.
#[derive(Debug, Clone)]
pub struct RecordedSave {
    pub attempt_id: String,
    pub question_id: String,
    pub value: AnswerValue,
    pub revision: u64,
}

#[derive(Debug)]
struct LocalAttempt {
    exam_id: String,
    finalized: bool,
}

/// In-memory implementation of both service traits.
#[derive(Default)]
pub struct LocalExamService {
    exams: Mutex<HashMap<String, ExamDefinition>>,
    /// When set, returned as the authoritative question set on attempt start.
    start_override: Mutex<Option<ExamDefinition>>,
    attempts: Mutex<HashMap<String, LocalAttempt>>,
    recorded_saves: Mutex<Vec<RecordedSave>>,
    last_finalized: Mutex<Option<Vec<Answer>>>,
    save_calls: AtomicU32,
    finalize_calls: AtomicU32,
    /// Remaining finalize calls to fail.
    finalize_failures: AtomicU32,
    /// Remaining save calls to fail, per question id.
    save_failures: Mutex<HashMap<String, u32>>,
}

impl LocalExamService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service holding a single exam.
    pub fn with_exam(exam: ExamDefinition) -> Self {
        let service = Self::new();
        service.add_exam(exam);
        service
    }

    /// Load exams from a TOML file or a directory of TOML files.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let service = Self::new();
        if path.is_dir() {
            for exam in parser::load_exam_directory(path)? {
                service.add_exam(exam);
            }
        } else {
            service.add_exam(parser::parse_exam(path)?);
        }
        Ok(service)
    }

    pub fn add_exam(&self, exam: ExamDefinition) {
        self.exams.lock().unwrap().insert(exam.id.clone(), exam);
    }

    /// Return this question set from `start_attempt` instead of the
    /// loaded one, simulating a server that regenerates per attempt.
    pub fn override_start_exam(&self, exam: ExamDefinition) {
        *self.start_override.lock().unwrap() = Some(exam);
    }

    /// Fail the next `count` finalize calls.
    pub fn fail_finalizes(&self, count: u32) {
        self.finalize_failures.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` saves for one question.
    pub fn fail_saves_for(&self, question_id: &str, count: u32) {
        self.save_failures
            .lock()
            .unwrap()
            .insert(question_id.to_string(), count);
    }

    pub fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn finalize_calls(&self) -> u32 {
        self.finalize_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_saves(&self) -> Vec<RecordedSave> {
        self.recorded_saves.lock().unwrap().clone()
    }

    /// The answer snapshot from the most recent successful finalize.
    pub fn last_finalized(&self) -> Option<Vec<Answer>> {
        self.last_finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExamContentProvider for LocalExamService {
    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition> {
        self.exams
            .lock()
            .unwrap()
            .get(exam_id)
            .cloned()
            .ok_or_else(|| TransportError::ExamNotFound(exam_id.to_string()).into())
    }

    async fn start_attempt(&self, exam_id: &str) -> anyhow::Result<AttemptStart> {
        if !self.exams.lock().unwrap().contains_key(exam_id) {
            return Err(TransportError::ExamNotFound(exam_id.to_string()).into());
        }

        let attempt_id = Uuid::new_v4().to_string();
        self.attempts.lock().unwrap().insert(
            attempt_id.clone(),
            LocalAttempt {
                exam_id: exam_id.to_string(),
                finalized: false,
            },
        );

        Ok(AttemptStart {
            handle: AttemptHandle {
                attempt_id,
                started_at: Utc::now(),
            },
            exam: self.start_override.lock().unwrap().clone(),
        })
    }
}

#[async_trait]
impl AnswerPersistence for LocalExamService {
    async fn save_answer(
        &self,
        handle: &AttemptHandle,
        question_id: &str,
        value: &AnswerValue,
        revision: u64,
    ) -> anyhow::Result<SaveAck> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        {
            let attempts = self.attempts.lock().unwrap();
            let attempt = attempts
                .get(&handle.attempt_id)
                .ok_or_else(|| TransportError::AttemptNotFound(handle.attempt_id.clone()))?;
            if attempt.finalized {
                return Err(TransportError::AttemptClosed(handle.attempt_id.clone()).into());
            }
        }

        if let Some(remaining) = self.save_failures.lock().unwrap().get_mut(question_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Network(format!(
                    "injected save failure for {question_id}"
                ))
                .into());
            }
        }

        self.recorded_saves.lock().unwrap().push(RecordedSave {
            attempt_id: handle.attempt_id.clone(),
            question_id: question_id.to_string(),
            value: value.clone(),
            revision,
        });

        Ok(SaveAck {
            question_id: question_id.to_string(),
            revision,
        })
    }

    async fn finalize_attempt(
        &self,
        handle: &AttemptHandle,
        answers: &[Answer],
    ) -> anyhow::Result<ConfirmationReceipt> {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);

        if self.finalize_failures.load(Ordering::SeqCst) > 0 {
            self.finalize_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(
                TransportError::Network("injected finalize failure".into()).into(),
            );
        }

        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts
            .get_mut(&handle.attempt_id)
            .ok_or_else(|| TransportError::AttemptNotFound(handle.attempt_id.clone()))?;
        if attempt.finalized {
            return Err(TransportError::AttemptClosed(handle.attempt_id.clone()).into());
        }
        attempt.finalized = true;
        tracing::debug!(
            attempt_id = %handle.attempt_id,
            exam_id = %attempt.exam_id,
            answers = answers.len(),
            "local attempt finalized"
        );

        *self.last_finalized.lock().unwrap() = Some(answers.to_vec());

        Ok(ConfirmationReceipt {
            attempt_id: handle.attempt_id.clone(),
            received_answers: answers.len(),
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use examflow_core::model::{Choice, Question, QuestionKind, SessionState};
    use examflow_core::session::ExamSession;

    fn sample_exam() -> ExamDefinition {
        ExamDefinition {
            id: "rust-101".into(),
            title: "Rust Basics".into(),
            description: String::new(),
            duration_secs: 600,
            questions: vec![
                Question {
                    id: "q1".into(),
                    prompt: "What does `let` introduce?".into(),
                    kind: QuestionKind::SingleChoice {
                        choices: vec![
                            Choice {
                                id: "a".into(),
                                text: "A binding".into(),
                            },
                            Choice {
                                id: "b".into(),
                                text: "A loop".into(),
                            },
                        ],
                    },
                },
                Question {
                    id: "q2".into(),
                    prompt: "Explain ownership.".into(),
                    kind: QuestionKind::FreeText,
                },
            ],
        }
    }

    fn make_session(service: &Arc<LocalExamService>) -> ExamSession {
        ExamSession::new(
            Arc::clone(service) as Arc<dyn ExamContentProvider>,
            Arc::clone(service) as Arc<dyn AnswerPersistence>,
        )
    }

    #[tokio::test]
    async fn full_attempt_through_local_service() {
        let service = Arc::new(LocalExamService::with_exam(sample_exam()));
        let mut session = make_session(&service);

        session.load("rust-101").await.unwrap();
        session.begin().await.unwrap();
        assert_eq!(session.state(), SessionState::Active);

        session
            .set_answer("q1", AnswerValue::Choice("a".into()))
            .unwrap();
        session.next().unwrap();
        session
            .set_answer("q2", AnswerValue::Text("values move".into()))
            .unwrap();
        assert!(session.is_last());

        session.submit().await.unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(service.finalize_calls(), 1);

        let finalized = service.last_finalized().unwrap();
        assert_eq!(finalized.len(), 2);
        assert_eq!(session.receipt().unwrap().received_answers, 2);
    }

    #[tokio::test]
    async fn unknown_exam_is_a_typed_error() {
        let service = LocalExamService::new();
        let err = service.fetch_exam("missing").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::ExamNotFound(_))
        ));
    }

    #[tokio::test]
    async fn saves_rejected_after_finalize() {
        let service = LocalExamService::with_exam(sample_exam());
        let start = service.start_attempt("rust-101").await.unwrap();

        service
            .finalize_attempt(&start.handle, &[])
            .await
            .unwrap();

        let err = service
            .save_answer(&start.handle, "q1", &AnswerValue::Choice("a".into()), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::AttemptClosed(_))
        ));

        let err = service.finalize_attempt(&start.handle, &[]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::AttemptClosed(_))
        ));
    }

    #[tokio::test]
    async fn finalize_failure_injection_then_recovery() {
        let service = Arc::new(LocalExamService::with_exam(sample_exam()));
        service.fail_finalizes(1);
        let mut session = make_session(&service);

        session.load("rust-101").await.unwrap();
        session.begin().await.unwrap();
        session.go_to(1).unwrap();

        assert!(session.submit().await.is_err());
        assert_eq!(session.state(), SessionState::Failed);

        session.submit().await.unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(service.finalize_calls(), 2);
    }

    #[tokio::test]
    async fn loads_exams_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rust-101.toml"),
            r#"
[exam]
id = "rust-101"
title = "Rust Basics"
duration_secs = 600

[[questions]]
id = "q1"
prompt = "Explain ownership."
kind = "free-text"
"#,
        )
        .unwrap();

        let service = LocalExamService::from_path(dir.path()).unwrap();
        let exam = service.fetch_exam("rust-101").await.unwrap();
        assert_eq!(exam.questions.len(), 1);
    }
}
