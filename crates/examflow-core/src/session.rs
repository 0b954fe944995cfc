//! Session state machine for one timed exam attempt.
//!
//! Owns the exam definition, countdown clock, navigation cursor, and
//! answer store, and coordinates submission so that at most one
//! finalize call is ever sent per attempt — whether triggered by the
//! student from the last question or by clock expiry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::answers::AnswerStore;
use crate::clock::{CountdownClock, TickOutcome};
use crate::cursor::NavigationCursor;
use crate::error::SessionError;
use crate::model::{
    AnswerValue, AttemptHandle, ConfirmationReceipt, ExamDefinition, SessionState,
};
use crate::traits::{AnswerPersistence, ExamContentProvider};

/// Callbacks for session-level events the caller may want to surface.
///
/// Save outcomes arrive here because background saves are
/// fire-and-forget: a failure is a notice, never a session error.
pub trait SessionObserver: Send + Sync {
    fn on_state_change(&self, from: SessionState, to: SessionState);
    fn on_answer_saved(&self, question_id: &str, revision: u64);
    fn on_save_error(&self, question_id: &str, revision: u64, error: &str);
    fn on_clock_expired(&self);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_state_change(&self, _: SessionState, _: SessionState) {}
    fn on_answer_saved(&self, _: &str, _: u64) {}
    fn on_save_error(&self, _: &str, _: u64, _: &str) {}
    fn on_clock_expired(&self) {}
}

/// Single-entry guard for the submission path.
///
/// Checked and set within one event turn, before any await, so a
/// concurrent second trigger (user action vs. clock expiry) is ignored
/// rather than producing a second finalize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitGate {
    Idle,
    InFlight,
    Done,
}

/// One student's attempt at a timed exam, from load to final submission.
pub struct ExamSession {
    provider: Arc<dyn ExamContentProvider>,
    persistence: Arc<dyn AnswerPersistence>,
    observer: Arc<dyn SessionObserver>,
    state: SessionState,
    exam_id: Option<String>,
    exam: Option<ExamDefinition>,
    attempt: Option<AttemptHandle>,
    clock: CountdownClock,
    cursor: NavigationCursor,
    answers: Arc<Mutex<AnswerStore>>,
    /// Cleared when the session leaves `Active`; in-flight save results
    /// arriving after that are disregarded.
    saves_live: Arc<AtomicBool>,
    gate: SubmitGate,
    submit_retryable: bool,
    receipt: Option<ConfirmationReceipt>,
}

impl ExamSession {
    pub fn new(
        provider: Arc<dyn ExamContentProvider>,
        persistence: Arc<dyn AnswerPersistence>,
    ) -> Self {
        Self::with_observer(provider, persistence, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        provider: Arc<dyn ExamContentProvider>,
        persistence: Arc<dyn AnswerPersistence>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            provider,
            persistence,
            observer,
            state: SessionState::NotStarted,
            exam_id: None,
            exam: None,
            attempt: None,
            clock: CountdownClock::new(),
            cursor: NavigationCursor::new(0),
            answers: Arc::new(Mutex::new(AnswerStore::new())),
            saves_live: Arc::new(AtomicBool::new(false)),
            gate: SubmitGate::Idle,
            submit_retryable: false,
            receipt: None,
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// `NotStarted -> Loading`: fetch the exam definition.
    ///
    /// A provider error is terminal for this attempt (`Failed`).
    pub async fn load(&mut self, exam_id: &str) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::InvalidStateTransition {
                state: self.state,
                action: "load",
            });
        }
        self.set_state(SessionState::Loading);

        match self.provider.fetch_exam(exam_id).await {
            Ok(exam) => {
                tracing::info!(exam_id, questions = exam.questions.len(), "exam loaded");
                self.exam_id = Some(exam_id.to_string());
                self.exam = Some(exam);
                Ok(())
            }
            Err(cause) => {
                tracing::error!(exam_id, "exam load failed: {cause:#}");
                self.set_state(SessionState::Failed);
                Err(SessionError::Load {
                    exam_id: exam_id.to_string(),
                    cause,
                })
            }
        }
    }

    /// `Loading -> Active`: start the server-side attempt, anchor the
    /// clock at the server start timestamp, reset cursor and answers.
    ///
    /// If the start response carries its own question set, it replaces
    /// the one fetched at load time for the rest of the session.
    pub async fn begin(&mut self) -> Result<(), SessionError> {
        let (Some(exam_id), SessionState::Loading) = (self.exam_id.clone(), self.state) else {
            return Err(SessionError::InvalidStateTransition {
                state: self.state,
                action: "begin",
            });
        };

        match self.provider.start_attempt(&exam_id).await {
            Ok(start) => {
                if let Some(exam) = start.exam {
                    tracing::info!(
                        exam_id,
                        questions = exam.questions.len(),
                        "adopting question set from attempt start response"
                    );
                    self.exam = Some(exam);
                }
                let Some(exam) = self.exam.as_ref() else {
                    return Err(SessionError::InvalidStateTransition {
                        state: self.state,
                        action: "begin",
                    });
                };

                self.clock.start(exam.duration_secs, start.handle.started_at);
                self.cursor = NavigationCursor::new(exam.questions.len());
                self.answers.lock().unwrap().clear();
                self.saves_live.store(true, Ordering::Release);
                tracing::info!(
                    exam_id,
                    attempt_id = %start.handle.attempt_id,
                    duration_secs = exam.duration_secs,
                    "attempt started"
                );
                self.attempt = Some(start.handle);
                self.set_state(SessionState::Active);
                Ok(())
            }
            Err(cause) => {
                tracing::error!(exam_id, "attempt start failed: {cause:#}");
                self.set_state(SessionState::Failed);
                Err(SessionError::Start { exam_id, cause })
            }
        }
    }

    /// Deliver one clock tick. Outside `Active` this is a no-op.
    ///
    /// On expiry the submission coordinator runs immediately (forced
    /// submission); a finalize failure surfaces as `SessionError::Submit`
    /// and leaves the session retryable.
    pub async fn handle_tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, SessionError> {
        if self.state != SessionState::Active {
            return Ok(TickOutcome::Stopped);
        }
        match self.clock.tick(now) {
            TickOutcome::Expired => {
                tracing::info!("attempt time expired, forcing submission");
                self.observer.on_clock_expired();
                self.finalize().await?;
                Ok(TickOutcome::Expired)
            }
            outcome => Ok(outcome),
        }
    }

    /// Explicit submission from the last question, or a retry after a
    /// failed finalize. From `Completed` this is an idempotent no-op.
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Completed => return Ok(()),
            // The other trigger already began the transition; ignore.
            SessionState::Submitting => return Ok(()),
            SessionState::Active => {
                if !self.cursor.is_last() {
                    return Err(SessionError::NotLast {
                        index: self.cursor.index(),
                    });
                }
            }
            SessionState::Failed if self.submit_retryable => {}
            state => {
                return Err(SessionError::InvalidStateTransition {
                    state,
                    action: "submit",
                });
            }
        }
        self.finalize().await
    }

    /// The submission coordinator: single entry point for both triggers.
    async fn finalize(&mut self) -> Result<(), SessionError> {
        if self.gate != SubmitGate::Idle {
            return Ok(());
        }
        self.gate = SubmitGate::InFlight;

        // Stop the clock first so a late tick cannot re-raise Expired,
        // then freeze the answer set.
        self.clock.stop();
        self.saves_live.store(false, Ordering::Release);
        self.set_state(SessionState::Submitting);

        let Some(handle) = self.attempt.clone() else {
            self.gate = SubmitGate::Idle;
            return Err(SessionError::InvalidStateTransition {
                state: self.state,
                action: "submit",
            });
        };
        let answers = self.answers.lock().unwrap().snapshot();

        match self.persistence.finalize_attempt(&handle, &answers).await {
            Ok(receipt) => {
                tracing::info!(
                    attempt_id = %handle.attempt_id,
                    answers = answers.len(),
                    "attempt finalized"
                );
                self.receipt = Some(receipt);
                self.gate = SubmitGate::Done;
                self.set_state(SessionState::Completed);
                Ok(())
            }
            Err(cause) => {
                tracing::error!(attempt_id = %handle.attempt_id, "finalize failed: {cause:#}");
                // Answers are retained; reopen the gate so submit() can
                // re-enter Submitting.
                self.gate = SubmitGate::Idle;
                self.submit_retryable = true;
                self.set_state(SessionState::Failed);
                Err(SessionError::Submit { cause })
            }
        }
    }

    // -----------------------------------------------------------------
    // Answer capture
    // -----------------------------------------------------------------

    /// Upsert the answer for a question and schedule its background
    /// save. Returns the local revision of the edit.
    ///
    /// The save is fire-and-forget: it never blocks editing or
    /// navigation, and an acknowledgement for a superseded revision is
    /// discarded instead of overwriting a newer edit.
    pub fn set_answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<u64, SessionError> {
        self.require_active("set_answer")?;
        let (Some(exam), Some(handle)) = (self.exam.as_ref(), self.attempt.as_ref()) else {
            return Err(SessionError::InvalidStateTransition {
                state: self.state,
                action: "set_answer",
            });
        };
        if exam.question_index(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }

        let revision = self
            .answers
            .lock()
            .unwrap()
            .set(question_id, value.clone());

        let persistence = Arc::clone(&self.persistence);
        let store = Arc::clone(&self.answers);
        let saves_live = Arc::clone(&self.saves_live);
        let observer = Arc::clone(&self.observer);
        let handle = handle.clone();
        let question_id = question_id.to_string();

        tokio::spawn(async move {
            let result = persistence
                .save_answer(&handle, &question_id, &value, revision)
                .await;

            if !saves_live.load(Ordering::Acquire) {
                tracing::debug!(question_id, revision, "save completed after session left active; disregarded");
                return;
            }
            let current = store.lock().unwrap().is_current(&question_id, revision);
            match (result, current) {
                (Ok(_), true) => observer.on_answer_saved(&question_id, revision),
                (Ok(_), false) => {
                    // Superseded by a newer local edit; dropping this is
                    // the last-writer-wins correctness rule, not an error.
                    tracing::debug!(question_id, revision, "discarding stale save ack");
                }
                (Err(e), true) => {
                    tracing::warn!(question_id, revision, "answer save failed: {e:#}");
                    observer.on_save_error(&question_id, revision, &e.to_string());
                }
                (Err(e), false) => {
                    tracing::debug!(
                        question_id,
                        revision,
                        "stale save failed after being superseded: {e:#}"
                    );
                }
            }
        });

        Ok(revision)
    }

    /// Current in-memory answer for a question, or `None` if unanswered.
    pub fn answer(&self, question_id: &str) -> Option<AnswerValue> {
        self.answers.lock().unwrap().get(question_id).cloned()
    }

    // -----------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------

    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.require_active("next")?;
        Ok(self.cursor.next())
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.require_active("previous")?;
        Ok(self.cursor.previous())
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.require_active("go_to")?;
        self.cursor.go_to(index)
    }

    // -----------------------------------------------------------------
    // Read-only observers
    // -----------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.clock.remaining(now)
    }

    pub fn current_index(&self) -> usize {
        self.cursor.index()
    }

    pub fn is_first(&self) -> bool {
        self.cursor.is_first()
    }

    pub fn is_last(&self) -> bool {
        self.cursor.is_last()
    }

    pub fn exam(&self) -> Option<&ExamDefinition> {
        self.exam.as_ref()
    }

    pub fn attempt(&self) -> Option<&AttemptHandle> {
        self.attempt.as_ref()
    }

    pub fn receipt(&self) -> Option<&ConfirmationReceipt> {
        self.receipt.as_ref()
    }

    /// Number of answers captured so far.
    pub fn answered_count(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    // -----------------------------------------------------------------

    fn require_active(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            Err(SessionError::InvalidStateTransition {
                state: self.state,
                action,
            })
        }
    }

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from != to {
            tracing::debug!(%from, %to, "session state change");
            self.state = to;
            self.observer.on_state_change(from, to);
        }
    }
}
