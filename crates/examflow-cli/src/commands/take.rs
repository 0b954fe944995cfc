//! The `examflow take` command.
//!
//! Runs one complete scripted attempt: load, begin, apply the answers
//! from a TOML answer script, then submit and print the receipt.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;

use examflow_core::model::{AnswerValue, SessionState};
use examflow_core::session::{ExamSession, SessionObserver};
use examflow_core::traits::{AnswerPersistence, ExamContentProvider};
use examflow_providers::config::load_config_from;
use examflow_providers::{create_remote_service, LocalExamService};

/// Console observer for session events.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_state_change(&self, from: SessionState, to: SessionState) {
        eprintln!("  State: {from} -> {to}");
    }

    fn on_answer_saved(&self, question_id: &str, revision: u64) {
        eprintln!("  Saved: {question_id} (rev {revision})");
    }

    fn on_save_error(&self, question_id: &str, revision: u64, error: &str) {
        eprintln!("  Save failed (non-fatal): {question_id} (rev {revision}): {error}");
    }

    fn on_clock_expired(&self) {
        eprintln!("  Time expired, forcing submission");
    }
}

#[derive(Debug, Deserialize)]
struct AnswerScript {
    #[serde(default)]
    answers: Vec<ScriptedAnswer>,
}

#[derive(Debug, Deserialize)]
struct ScriptedAnswer {
    question: String,
    #[serde(default)]
    choice: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ScriptedAnswer {
    fn value(&self) -> Result<AnswerValue> {
        match (&self.choice, &self.text) {
            (Some(choice), None) => Ok(AnswerValue::Choice(choice.clone())),
            (None, Some(text)) => Ok(AnswerValue::Text(text.clone())),
            _ => anyhow::bail!(
                "answer for '{}' must set exactly one of `choice` or `text`",
                self.question
            ),
        }
    }
}

pub async fn execute(
    exam_id: String,
    answers_path: PathBuf,
    exam_path: Option<PathBuf>,
    remote: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let script_content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answer script: {}", answers_path.display()))?;
    let script: AnswerScript = toml::from_str(&script_content)
        .with_context(|| format!("failed to parse answer script: {}", answers_path.display()))?;

    let (provider, persistence): (Arc<dyn ExamContentProvider>, Arc<dyn AnswerPersistence>) =
        if remote {
            let service = Arc::new(create_remote_service(&config)?);
            (service.clone(), service)
        } else {
            let path = exam_path.unwrap_or_else(|| config.exam_dir.clone());
            let service = Arc::new(LocalExamService::from_path(&path)?);
            (service.clone(), service)
        };

    let mut session = ExamSession::with_observer(provider, persistence, Arc::new(ConsoleObserver));

    session.load(&exam_id).await?;
    session.begin().await?;

    let attempt_id = session
        .attempt()
        .context("no attempt handle after begin")?
        .attempt_id
        .clone();
    eprintln!(
        "Attempt {attempt_id}: {}s remaining, {} question(s)",
        session.remaining_seconds(Utc::now()),
        session.exam().map(|e| e.questions.len()).unwrap_or(0)
    );

    for scripted in &script.answers {
        let index = session
            .exam()
            .and_then(|e| e.question_index(&scripted.question))
            .with_context(|| format!("exam has no question '{}'", scripted.question))?;
        session.go_to(index)?;
        session.set_answer(&scripted.question, scripted.value()?)?;
    }

    // Submission is only honored from the last question.
    let last = session
        .exam()
        .map(|e| e.questions.len().saturating_sub(1))
        .unwrap_or(0);
    session.go_to(last)?;

    if let Err(e) = session.submit().await {
        if e.is_retryable() {
            eprintln!("Submit failed ({e}), retrying once");
            session.submit().await?;
        } else {
            return Err(e.into());
        }
    }

    let receipt = session.receipt().context("no receipt after completion")?;
    println!(
        "Submitted attempt {}: {} answer(s) received at {}",
        receipt.attempt_id, receipt.received_answers, receipt.completed_at
    );

    Ok(())
}
