//! Question spec validation.
//!
//! Authors write questions as loose JSON: feedback can be a bare string or a
//! `[bool|number, string]` pair, parts and scores are optional. This module
//! checks that input and canonicalizes it into a [`QuestionModel`] whose
//! scores are all bounded integers. Everything downstream relies on that.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};

use crate::error::ValidationError;
use crate::model::{FeedbackModel, MatchTable, PartModel, QuestionModel};

/// Validate a raw question spec and canonicalize it.
pub fn validate_question(raw: &Value) -> Result<QuestionModel, ValidationError> {
    let at = "question";
    let obj = raw.as_object().ok_or_else(|| ValidationError::NotAnObject {
        at: at.to_string(),
    })?;

    if obj.contains_key("part") {
        return Err(ValidationError::DeprecatedPart { at: at.to_string() });
    }

    let prompt = optional_string(obj, "prompt", at)?;
    let hints = optional_hints(obj, at)?;
    let declared_score = optional_score(obj, at)?;

    let parts = match obj.get("parts") {
        None => vec![PartModel::synthesized(declared_score.unwrap_or(1))],
        Some(Value::Array(items)) if items.is_empty() => {
            return Err(ValidationError::EmptyParts { at: at.to_string() })
        }
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, part)| validate_part(part, i))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::FieldType {
                at: at.to_string(),
                field: "parts",
                expected: "a non-empty array",
            })
        }
    };

    // Only now is there a concrete number to bound question-level entries by.
    let score = match declared_score {
        Some(score) => score,
        None => parts
            .iter()
            .try_fold(0u32, |total, p| total.checked_add(p.score))
            .ok_or_else(|| ValidationError::ScoreOverflow { at: at.to_string() })?,
    };
    let matches = match_table(obj, score, "")?;

    Ok(QuestionModel {
        prompt,
        hints,
        config: optional_config(obj),
        score,
        parts,
        matches,
    })
}

/// Validate the part at `index` of a question's `parts` array.
pub fn validate_part(raw: &Value, index: usize) -> Result<PartModel, ValidationError> {
    let at = format!("parts[{index}]");
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject { at: at.clone() })?;

    let prompt = optional_string(obj, "prompt", &at)?;
    let hints = optional_hints(obj, &at)?;
    let score = optional_score(obj, &at)?.unwrap_or(1);
    let matches = match_table(obj, score, &at)?;

    Ok(PartModel {
        prompt,
        hints,
        config: optional_config(obj),
        score,
        matches,
    })
}

/// Validate one match entry against the score of the part (or question)
/// that owns it.
pub fn validate_feedback(
    raw: &Value,
    owner_score: u32,
    at: &str,
) -> Result<FeedbackModel, ValidationError> {
    let shape_err = || ValidationError::FeedbackShape { at: at.to_string() };

    let pair = match raw {
        Value::String(message) => {
            return Ok(FeedbackModel {
                score: 0,
                message: message.clone(),
            })
        }
        Value::Array(pair) if pair.len() == 2 => pair,
        _ => return Err(shape_err()),
    };

    let message = pair[1].as_str().ok_or_else(shape_err)?.to_string();
    let score = match &pair[0] {
        Value::Bool(full) => {
            if *full {
                owner_score
            } else {
                0
            }
        }
        Value::Number(n) => whole_number(n)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v <= owner_score)
            .ok_or_else(|| ValidationError::FeedbackOutOfRange {
                at: at.to_string(),
                score: n.to_string(),
                max: owner_score,
            })?,
        _ => return Err(shape_err()),
    };

    Ok(FeedbackModel { score, message })
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
    at: &str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::FieldType {
            at: at.to_string(),
            field,
            expected: "a string",
        }),
    }
}

fn optional_hints(
    obj: &Map<String, Value>,
    at: &str,
) -> Result<Option<Vec<String>>, ValidationError> {
    let err = || ValidationError::FieldType {
        at: at.to_string(),
        field: "hints",
        expected: "an array of strings",
    };
    match obj.get("hints") {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|h| h.as_str().map(str::to_string).ok_or_else(err))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(err()),
    }
}

fn optional_score(obj: &Map<String, Value>, at: &str) -> Result<Option<u32>, ValidationError> {
    match obj.get("score") {
        None => Ok(None),
        Some(Value::Number(n)) => whole_number(n)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidScore { at: at.to_string() }),
        Some(_) => Err(ValidationError::InvalidScore { at: at.to_string() }),
    }
}

fn optional_config(obj: &Map<String, Value>) -> Option<Value> {
    obj.get("config").filter(|c| !c.is_null()).cloned()
}

fn match_table(
    obj: &Map<String, Value>,
    owner_score: u32,
    at: &str,
) -> Result<MatchTable, ValidationError> {
    let owner = if at.is_empty() { "question" } else { at };
    let entries = match obj.get("match") {
        None => return Ok(MatchTable::new()),
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            return Err(ValidationError::FieldType {
                at: owner.to_string(),
                field: "match",
                expected: "an object",
            })
        }
    };

    let prefix = if at.is_empty() {
        String::new()
    } else {
        format!("{at}.")
    };
    entries
        .iter()
        .map(|(key, raw)| {
            let entry_at = format!("{prefix}match[{key:?}]");
            validate_feedback(raw, owner_score, &entry_at).map(|fb| (key.clone(), fb))
        })
        .collect()
}

/// Integer value of a JSON number, accepting `3.0` but not `3.5`.
fn whole_number(n: &Number) -> Option<u64> {
    if let Some(v) = n.as_u64() {
        return Some(v);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u64)
}

/// Parse and validate a question from JSON text.
pub fn parse_question_str(content: &str, source_path: &Path) -> Result<QuestionModel> {
    let raw: Value = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;

    validate_question(&raw)
        .with_context(|| format!("invalid question: {}", source_path.display()))
}

/// Read, parse and validate a question file.
pub fn load_question(path: &Path) -> Result<QuestionModel> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file: {}", path.display()))?;

    parse_question_str(&content, path)
}

/// Recursively load every `.json` question under `dir`, sorted by path.
///
/// Unlike a lenient loader this stops at the first invalid file: a question
/// that fails validation would never render.
pub fn load_question_directory(dir: &Path) -> Result<Vec<(PathBuf, QuestionModel)>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    collect_json_files(dir, &mut paths)?;
    paths.sort();

    paths
        .into_iter()
        .map(|path| load_question(&path).map(|q| (path, q)))
        .collect()
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

/// A non-fatal authoring problem found by [`lint_question`].
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The part index (if applicable).
    pub part: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Check a validated question for problems that will not stop it from
/// rendering but will surprise students or authors.
pub fn lint_question(question: &QuestionModel) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Every part needs some way to earn full credit, or 100% is unreachable
    for (i, part) in question.parts.iter().enumerate() {
        let full_credit = part
            .matches
            .values()
            .chain(question.matches.values())
            .any(|fb| fb.score >= part.score);
        if !full_credit {
            warnings.push(ValidationWarning {
                part: Some(i),
                message: format!(
                    "no match entry awards full credit ({} points); the question can never reach 100%",
                    part.score
                ),
            });
        }
    }

    let available = question.points_available();
    if u64::from(question.score) != available {
        warnings.push(ValidationWarning {
            part: None,
            message: format!(
                "question score {} differs from the sum of part scores {available}; percentages use the part sum",
                question.score
            ),
        });
    }

    let empty_hint = |hints: &Option<Vec<String>>| {
        hints
            .as_ref()
            .is_some_and(|hs| hs.iter().any(|h| h.trim().is_empty()))
    };
    if empty_hint(&question.hints) {
        warnings.push(ValidationWarning {
            part: None,
            message: "hints contain an empty string".into(),
        });
    }
    for (i, part) in question.parts.iter().enumerate() {
        if empty_hint(&part.hints) {
            warnings.push(ValidationWarning {
                part: Some(i),
                message: "hints contain an empty string".into(),
            });
        }
    }

    if question.matches.is_empty() && question.parts.iter().all(|p| p.matches.is_empty()) {
        warnings.push(ValidationWarning {
            part: None,
            message: "no match entries; every answer will be reported as not_found".into(),
        });
    }

    warnings
}
