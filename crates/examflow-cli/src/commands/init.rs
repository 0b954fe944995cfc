//! The `examflow init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create examflow.toml
    if std::path::Path::new("examflow.toml").exists() {
        println!("examflow.toml already exists, skipping.");
    } else {
        std::fs::write("examflow.toml", SAMPLE_CONFIG)?;
        println!("Created examflow.toml");
    }

    // Create example exam
    std::fs::create_dir_all("exams")?;
    let example_path = std::path::Path::new("exams/rust-basics.toml");
    if example_path.exists() {
        println!("exams/rust-basics.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXAM)?;
        println!("Created exams/rust-basics.toml");
    }

    // Create example answer script
    let script_path = std::path::Path::new("exams/rust-basics.answers.toml");
    if script_path.exists() {
        println!("exams/rust-basics.answers.toml already exists, skipping.");
    } else {
        std::fs::write(script_path, EXAMPLE_ANSWERS)?;
        println!("Created exams/rust-basics.answers.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit examflow.toml with your backend URL and token");
    println!("  2. Run: examflow validate --exam exams/rust-basics.toml");
    println!("  3. Run: examflow take --exam-id rust-basics --answers exams/rust-basics.answers.toml --exam-path exams");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examflow configuration

# Remote exam backend (used with `take --remote`)
# base_url = "https://exams.example.com"
# token = "${EXAMFLOW_TOKEN}"
request_timeout_secs = 30

# Directory of TOML exam files for local mode
exam_dir = "./exams"
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
id = "rust-basics"
title = "Rust Basics"
description = "A short introductory Rust quiz"
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

[[questions.choices]]
id = "c"
text = "A module"

[[questions]]
id = "q2"
prompt = "Explain ownership in one sentence."
kind = "free-text"
"#;

const EXAMPLE_ANSWERS: &str = r#"# Answer script for `examflow take`

[[answers]]
question = "q1"
choice = "a"

[[answers]]
question = "q2"
text = "Each value has a single owner; assignment moves it."
"#;
