//! The `examflow info` command.

use std::path::PathBuf;

use anyhow::Result;

use examflow_core::model::QuestionKind;

pub fn execute(exam_path: PathBuf) -> Result<()> {
    let exam = examflow_core::parser::parse_exam(&exam_path)?;

    println!("{} ({})", exam.title, exam.id);
    if !exam.description.is_empty() {
        println!("{}", exam.description);
    }
    println!(
        "Duration: {}m{}s",
        exam.duration_secs / 60,
        exam.duration_secs % 60
    );
    println!("Questions: {}", exam.questions.len());

    for (i, question) in exam.questions.iter().enumerate() {
        let kind = match &question.kind {
            QuestionKind::SingleChoice { choices } => {
                format!("single-choice, {} choices", choices.len())
            }
            QuestionKind::FreeText => "free-text".to_string(),
        };
        println!("  {}. [{}] {} ({kind})", i + 1, question.id, question.prompt);
    }

    Ok(())
}
