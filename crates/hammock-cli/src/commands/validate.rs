//! The `hammock validate` command.

use std::path::PathBuf;

use anyhow::Result;

use hammock_core::validate::{lint_question, load_question, load_question_directory};

pub fn execute(question_path: PathBuf) -> Result<()> {
    let questions = if question_path.is_dir() {
        load_question_directory(&question_path)?
    } else {
        vec![(question_path.clone(), load_question(&question_path)?)]
    };

    let mut total_warnings = 0;

    for (path, question) in &questions {
        println!(
            "Question: {} ({} parts, score {})",
            path.display(),
            question.parts.len(),
            question.score
        );

        let warnings = lint_question(question);
        for w in &warnings {
            let prefix = w
                .part
                .map(|i| format!("  [part {}]", i + 1))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All questions valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
