//! TOML exam definition parser.
//!
//! Loads exam definitions from TOML files and directories, and
//! validates them for common authoring mistakes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Choice, ExamDefinition, Question, QuestionKind};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    duration_secs: u64,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    kind: String,
    #[serde(default)]
    choices: Vec<TomlChoice>,
}

#[derive(Debug, Deserialize)]
struct TomlChoice {
    id: String,
    text: String,
}

/// Parse a single TOML file into an `ExamDefinition`.
pub fn parse_exam(path: &Path) -> Result<ExamDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `ExamDefinition` (useful for testing).
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDefinition> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind = match q.kind.as_str() {
                "single-choice" => QuestionKind::SingleChoice {
                    choices: q
                        .choices
                        .into_iter()
                        .map(|c| Choice {
                            id: c.id,
                            text: c.text,
                        })
                        .collect(),
                },
                "free-text" => {
                    if !q.choices.is_empty() {
                        anyhow::bail!("question '{}': free-text questions take no choices", q.id);
                    }
                    QuestionKind::FreeText
                }
                other => anyhow::bail!("question '{}': unknown kind '{}'", q.id, other),
            };

            Ok(Question {
                id: q.id,
                prompt: q.prompt,
                kind,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExamDefinition {
        id: parsed.exam.id,
        title: parsed.exam.title,
        description: parsed.exam.description,
        duration_secs: parsed.exam.duration_secs,
        questions,
    })
}

/// Recursively load all `.toml` exam files from a directory.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<ExamDefinition>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam(&path) {
                Ok(exam) => exams.push(exam),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(exams)
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an exam definition for common issues.
pub fn validate_exam(exam: &ExamDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exam.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "exam has no questions".into(),
        });
    }

    if exam.duration_secs == 0 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "duration_secs is 0: the attempt expires immediately".into(),
        });
    }

    // Check for duplicate question IDs
    let mut seen_ids = std::collections::HashSet::new();
    for question in &exam.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &exam.questions {
        if question.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "prompt is empty".into(),
            });
        }

        if let QuestionKind::SingleChoice { choices } = &question.kind {
            if choices.len() < 2 {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    message: format!(
                        "single-choice question has {} choice(s), expected at least 2",
                        choices.len()
                    ),
                });
            }

            let mut seen_choices = std::collections::HashSet::new();
            for choice in choices {
                if !seen_choices.insert(&choice.id) {
                    warnings.push(ValidationWarning {
                        question_id: Some(question.id.clone()),
                        message: format!("duplicate choice ID: {}", choice.id),
                    });
                }
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[exam]
id = "rust-101"
title = "Rust Basics"
description = "Introductory Rust questions"
duration_secs = 600

[[questions]]
id = "q1"
prompt = "What does `let` introduce?"
kind = "single-choice"

[[questions.choices]]
id = "a"
text = "A binding"

[[questions.choices]]
id = "b"
text = "A loop"

[[questions]]
id = "q2"
prompt = "Explain ownership in one sentence."
kind = "free-text"
"#;

    #[test]
    fn parse_valid_toml() {
        let exam = parse_exam_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(exam.id, "rust-101");
        assert_eq!(exam.duration_secs, 600);
        assert_eq!(exam.questions.len(), 2);
        match &exam.questions[0].kind {
            QuestionKind::SingleChoice { choices } => assert_eq!(choices.len(), 2),
            other => panic!("expected single-choice, got {other:?}"),
        }
        assert!(matches!(exam.questions[1].kind, QuestionKind::FreeText));
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[exam]
id = "minimal"
title = "Minimal"
duration_secs = 60
"#;
        let exam = parse_exam_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert!(exam.description.is_empty());
        assert!(exam.questions.is_empty());
    }

    #[test]
    fn parse_unknown_kind() {
        let toml = r#"
[exam]
id = "bad"
title = "Bad"
duration_secs = 60

[[questions]]
id = "q1"
prompt = "?"
kind = "multi-choice"
"#;
        let err = parse_exam_str(toml, &PathBuf::from("test.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown kind"));
    }

    #[test]
    fn parse_free_text_with_choices() {
        let toml = r#"
[exam]
id = "bad"
title = "Bad"
duration_secs = 60

[[questions]]
id = "q1"
prompt = "?"
kind = "free-text"

[[questions.choices]]
id = "a"
text = "stray"
"#;
        assert!(parse_exam_str(toml, &PathBuf::from("test.toml")).is_err());
    }

    #[test]
    fn validate_duplicate_question_ids() {
        let toml = r#"
[exam]
id = "dupes"
title = "Dupes"
duration_secs = 60

[[questions]]
id = "same"
prompt = "First"
kind = "free-text"

[[questions]]
id = "same"
prompt = "Second"
kind = "free-text"
"#;
        let exam = parse_exam_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_exam(&exam);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
    }

    #[test]
    fn validate_single_choice_needs_two_choices() {
        let toml = r#"
[exam]
id = "thin"
title = "Thin"
duration_secs = 60

[[questions]]
id = "q1"
prompt = "Pick one"
kind = "single-choice"

[[questions.choices]]
id = "only"
text = "The only option"
"#;
        let exam = parse_exam_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_exam(&exam);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("expected at least 2")));
    }

    #[test]
    fn validate_zero_duration() {
        let exam = ExamDefinition {
            id: "zero".into(),
            title: "Zero".into(),
            description: String::new(),
            duration_secs: 0,
            questions: vec![],
        };
        let warnings = validate_exam(&exam);
        assert!(warnings.iter().any(|w| w.message.contains("duration")));
        assert!(warnings.iter().any(|w| w.message.contains("no questions")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_exam_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("rust-101.toml");
        std::fs::write(&file_path, VALID_TOML).unwrap();

        let exams = load_exam_directory(dir.path()).unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].id, "rust-101");
    }
}
