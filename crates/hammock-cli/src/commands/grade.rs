//! The `hammock grade` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use hammock_core::grading;
use hammock_core::template::BraceTemplater;
use hammock_core::validate::load_question;
use hammock_host::parse_answers;

pub fn execute(question_path: PathBuf, responses: String) -> Result<()> {
    let question = load_question(&question_path)?;
    let answers = parse_answers(&responses)?;
    if answers.len() > question.parts.len() {
        eprintln!(
            "Warning: {} answers for {} parts; extra answers are ignored",
            answers.len(),
            question.parts.len()
        );
    }

    let feedback = grading::grade(&question, &answers, &BraceTemplater);
    let summary = grading::score(&question, &feedback);

    let mut table = Table::new();
    table.set_header(vec!["Part", "Key", "Status", "Score", "Message"]);

    for (i, (part, fb)) in question.parts.iter().zip(&feedback).enumerate() {
        let row = match fb {
            Some(fb) => vec![
                Cell::new(i + 1),
                Cell::new(&fb.key),
                Cell::new(fb.status),
                Cell::new(format!("{}/{}", fb.score, part.score)),
                Cell::new(&fb.message),
            ],
            None => vec![
                Cell::new(i + 1),
                Cell::new("-"),
                Cell::new("unanswered"),
                Cell::new(format!("0/{}", part.score)),
                Cell::new(""),
            ],
        };
        table.add_row(row);
    }

    println!("{table}");
    println!(
        "Score: {}% ({}/{} points)",
        summary.percentage, summary.points_earned, summary.points_available
    );

    Ok(())
}
