//! The `hammock simulate` command.
//!
//! Runs a script of steps against an in-memory host, so an author can see
//! what a sequence of visits would persist and score.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use hammock_core::validate::load_question;
use hammock_core::{AttemptRunner, QuestionModel, RunnerConfig, RunnerHandle};
use hammock_host::{load_config_from, parse_answers, HostCall, MockHost, ScriptedActivity, ScriptedResponse};

#[derive(Debug, PartialEq)]
enum Step {
    Submit(String),
    Reset,
    /// Drop the runner and start a new one over the same records.
    Reopen,
    Render,
}

fn parse_script(script: &str) -> Result<Vec<Step>> {
    script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|step| {
            let (verb, rest) = step.split_once(char::is_whitespace).unwrap_or((step, ""));
            match verb {
                "submit" => Ok(Step::Submit(rest.trim().to_string())),
                "reset" => Ok(Step::Reset),
                "reopen" => Ok(Step::Reopen),
                "render" => Ok(Step::Render),
                other => anyhow::bail!("unknown step {other:?} (expected submit, reset, reopen, render)"),
            }
        })
        .collect()
}

struct Session {
    host: Arc<MockHost>,
    activity: Arc<ScriptedActivity>,
    handle: RunnerHandle<ScriptedResponse>,
}

impl Session {
    fn open(question: &Arc<QuestionModel>, host: MockHost, config: &RunnerConfig) -> Result<Self> {
        let host = Arc::new(host);
        let activity = Arc::new(ScriptedActivity::new());
        let runner = AttemptRunner::new(question.clone(), host.clone(), activity.clone(), config.clone())
            .context("host reported an unusable attempt")?;
        Ok(Self {
            host,
            activity,
            handle: RunnerHandle::spawn(runner),
        })
    }
}

pub async fn execute(
    question_path: Option<PathBuf>,
    script: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let question_path = question_path.unwrap_or_else(|| config.question_path());
    let question = Arc::new(load_question(&question_path)?);
    let runner_config = config.runner_config();
    let steps = parse_script(&script)?;

    let mut session = Session::open(&question, MockHost::new(), &runner_config)?;
    let mut journal: Vec<HostCall> = Vec::new();

    for (n, step) in steps.iter().enumerate() {
        let n = n + 1;
        match step {
            Step::Submit(answers) => {
                session.activity.answer(parse_answers(answers)?);
                let summary = session
                    .handle
                    .submit()
                    .await
                    .with_context(|| format!("step {n}: submit failed"))?;
                let (phase, attempt) = session.handle.status().await?;
                println!(
                    "step {n}: submit {answers} -> {}% ({}/{} points), phase {phase}, attempt {attempt}",
                    summary.percentage, summary.points_earned, summary.points_available
                );
            }
            Step::Reset => {
                session
                    .handle
                    .reset()
                    .await
                    .with_context(|| format!("step {n}: reset failed"))?;
                let (phase, attempt) = session.handle.status().await?;
                println!("step {n}: reset -> phase {phase}, attempt {attempt}");
            }
            Step::Reopen => {
                journal.extend(session.host.calls());
                let host = session.host.reopen();
                session = Session::open(&question, host, &runner_config)?;
                let (phase, attempt) = session.handle.status().await?;
                println!("step {n}: reopen -> phase {phase}, attempt {attempt}");
            }
            Step::Render => {
                let view = session.handle.question_data().await?;
                println!("step {n}: render");
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
        }
    }

    journal.extend(session.host.calls());
    println!("\nHost calls:");
    for call in &journal {
        println!("  {call}");
    }
    let scores: Vec<String> = journal
        .iter()
        .filter_map(|c| match c {
            HostCall::ScoreAttempt(pct) => Some(format!("{pct}%")),
            _ => None,
        })
        .collect();
    if !scores.is_empty() {
        println!("Scores reported: {}", scores.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_steps() {
        let steps = parse_script("submit a,b{x=1}; reset;reopen ; render;").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Submit("a,b{x=1}".into()),
                Step::Reset,
                Step::Reopen,
                Step::Render,
            ]
        );
    }

    #[test]
    fn unknown_step_is_an_error() {
        assert!(parse_script("submit a; jump").is_err());
    }
}
