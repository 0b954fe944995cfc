//! In-memory answer store with per-question revisions.
//!
//! The store is the single source of truth the caller reads from and
//! the only writer. Each upsert bumps a per-question revision counter;
//! persistence acknowledgements carrying a revision older than the
//! current one are stale and must be discarded (last-writer-wins by
//! local edit order, not by network completion order).

use std::collections::HashMap;

use crate::model::{Answer, AnswerValue};

#[derive(Debug, Clone)]
struct StoredAnswer {
    value: AnswerValue,
    revision: u64,
}

/// Upsert map of `question_id -> (value, revision)`.
#[derive(Debug, Default)]
pub struct AnswerStore {
    entries: HashMap<String, StoredAnswer>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the answer for a question and return its new revision.
    ///
    /// Revisions start at 1 and increase by one per edit of the same
    /// question; a later edit overwrites the prior value, never appends.
    pub fn set(&mut self, question_id: &str, value: AnswerValue) -> u64 {
        match self.entries.get_mut(question_id) {
            Some(entry) => {
                entry.revision += 1;
                entry.value = value;
                entry.revision
            }
            None => {
                self.entries
                    .insert(question_id.to_string(), StoredAnswer { value, revision: 1 });
                1
            }
        }
    }

    /// Current in-memory value, or `None` if unanswered.
    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.entries.get(question_id).map(|e| &e.value)
    }

    /// Current revision for a question, if answered.
    pub fn revision(&self, question_id: &str) -> Option<u64> {
        self.entries.get(question_id).map(|e| e.revision)
    }

    /// Whether `revision` is still the latest local edit for the question.
    ///
    /// A save acknowledgement for anything else is stale and its result
    /// must be disregarded.
    pub fn is_current(&self, question_id: &str, revision: u64) -> bool {
        self.revision(question_id) == Some(revision)
    }

    /// One-time consistent copy of all captured answers, used only at
    /// final submission. Sorted by question id for determinism.
    pub fn snapshot(&self) -> Vec<Answer> {
        let mut answers: Vec<Answer> = self
            .entries
            .iter()
            .map(|(question_id, entry)| Answer {
                question_id: question_id.clone(),
                value: entry.value.clone(),
                revision: entry.revision,
            })
            .collect();
        answers.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        answers
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
