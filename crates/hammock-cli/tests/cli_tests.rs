//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hammock() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("hammock").unwrap()
}

const QUESTION: &str = r#"{
    "prompt": "Metals",
    "parts": [
        { "prompt": "Best conductor", "match": { "silver": [true, "Right, {{key}}"] } },
        { "prompt": "Liquid metal", "match": { "mercury": [true, "Yes"] } }
    ]
}"#;

fn write_question(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn validate_valid_question() {
    let dir = TempDir::new().unwrap();
    let path = write_question(dir.path(), "q.json", QUESTION);

    hammock()
        .arg("validate")
        .arg("--question")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 parts, score 2"))
        .stdout(predicate::str::contains("All questions valid"));
}

#[test]
fn validate_directory_reports_lint_warnings() {
    let dir = TempDir::new().unwrap();
    write_question(dir.path(), "a.json", QUESTION);
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_question(
        &dir.path().join("nested"),
        "b.json",
        r#"{ "parts": [ { "match": { "x": [0, "no"] } } ] }"#,
    );

    hammock()
        .arg("validate")
        .arg("--question")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("a.json"))
        .stdout(predicate::str::contains("b.json"))
        .stdout(predicate::str::contains("[part 1] WARNING"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_rejects_deprecated_part_field() {
    let dir = TempDir::new().unwrap();
    let path = write_question(dir.path(), "old.json", r#"{ "part": { "prompt": "x" } }"#);

    hammock()
        .arg("validate")
        .arg("--question")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("parts"));
}

#[test]
fn validate_nonexistent_file() {
    hammock()
        .arg("validate")
        .arg("--question")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn grade_prints_table_and_percentage() {
    let dir = TempDir::new().unwrap();
    let path = write_question(dir.path(), "q.json", QUESTION);

    hammock()
        .arg("grade")
        .arg("--question")
        .arg(&path)
        .arg("--responses")
        .arg("silver,gold")
        .assert()
        .success()
        .stdout(predicate::str::contains("Right, silver"))
        .stdout(predicate::str::contains("not_found"))
        .stdout(predicate::str::contains("Score: 50% (1/2 points)"));
}

#[test]
fn grade_unanswered_parts() {
    let dir = TempDir::new().unwrap();
    let path = write_question(dir.path(), "q.json", QUESTION);

    hammock()
        .arg("grade")
        .arg("--question")
        .arg(&path)
        .arg("--responses")
        .arg("-")
        .assert()
        .success()
        .stdout(predicate::str::contains("unanswered"))
        .stdout(predicate::str::contains("Score: 0%"));
}

#[test]
fn simulate_submit_reset_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = write_question(dir.path(), "q.json", QUESTION);

    hammock()
        .arg("simulate")
        .arg("--question")
        .arg(&path)
        .arg("--script")
        .arg("submit silver,-; reopen; submit silver,mercury; reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("step 1: submit silver,- -> 50%"))
        .stdout(predicate::str::contains("step 2: reopen -> phase ready, attempt 1"))
        .stdout(predicate::str::contains("phase completed, attempt 2"))
        .stdout(predicate::str::contains("step 4: reset -> phase ready, attempt 3"))
        .stdout(predicate::str::contains("write reset@2"))
        .stdout(predicate::str::contains("Scores reported: 50%, 100%"));
}

#[test]
fn simulate_uses_configured_question() {
    let dir = TempDir::new().unwrap();
    write_question(dir.path(), "question.json", QUESTION);
    let config = dir.path().join("hammock.toml");
    std::fs::write(
        &config,
        format!("content_dir = {:?}\ntelemetry = false\n", dir.path().display().to_string()),
    )
    .unwrap();

    hammock()
        .arg("simulate")
        .arg("--config")
        .arg(&config)
        .arg("--script")
        .arg("submit silver,mercury")
        .assert()
        .success()
        .stdout(predicate::str::contains("100%"))
        .stdout(predicate::str::contains("log part1").not());
}

#[test]
fn simulate_rejects_unknown_step() {
    let dir = TempDir::new().unwrap();
    let path = write_question(dir.path(), "q.json", QUESTION);

    hammock()
        .arg("simulate")
        .arg("--question")
        .arg(&path)
        .arg("--script")
        .arg("jump")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown step"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    hammock()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created hammock.toml"))
        .stdout(predicate::str::contains("Created questions/example.json"));

    assert!(dir.path().join("hammock.toml").exists());

    // The starter question is itself valid
    hammock()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--question")
        .arg("questions/example.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 parts, score 3"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    hammock()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    hammock()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    hammock()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question validation and attempt runner"));
}

#[test]
fn version_output() {
    hammock()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hammock"));
}
