//! Core data model types for hammock.
//!
//! `QuestionModel` and friends are the canonical form produced by
//! [`validate_question`](crate::validate::validate_question); nothing else
//! constructs them from author input. Runtime types (`AttemptId`,
//! `AttemptState`, `FeedbackResult`) are what the runner persists.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ConfigurationError;

/// A key → feedback table. Ordered so canonical models serialize stably.
pub type MatchTable = BTreeMap<String, FeedbackModel>;

/// A validated question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    /// Opaque configuration passed through to the activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Maximum score for the whole question.
    pub score: u32,
    /// Always non-empty.
    pub parts: Vec<PartModel>,
    /// Question-wide fallback table, consulted after a part's own table.
    #[serde(rename = "match", skip_serializing_if = "BTreeMap::is_empty")]
    pub matches: MatchTable,
}

impl QuestionModel {
    /// Sum of the part scores; the denominator of the attempt percentage.
    pub fn points_available(&self) -> u64 {
        self.parts.iter().map(|p| u64::from(p.score)).sum()
    }
}

/// A validated question part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub score: u32,
    #[serde(rename = "match", skip_serializing_if = "BTreeMap::is_empty")]
    pub matches: MatchTable,
}

impl PartModel {
    /// The part synthesized for questions that declare no `parts`.
    pub fn synthesized(score: u32) -> Self {
        Self {
            prompt: None,
            hints: None,
            config: None,
            score,
            matches: MatchTable::new(),
        }
    }
}

/// A validated match entry: points awarded and a message template.
///
/// Serializes as the `[score, message]` pair authors write, so a canonical
/// model re-validates to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackModel {
    pub score: u32,
    pub message: String,
}

impl Serialize for FeedbackModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.score, &self.message).serialize(serializer)
    }
}

/// Outcome class of a graded part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Correct,
    Incorrect,
    NotFound,
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackStatus::Correct => write!(f, "correct"),
            FeedbackStatus::Incorrect => write!(f, "incorrect"),
            FeedbackStatus::NotFound => write!(f, "not_found"),
        }
    }
}

/// Feedback for one answered part, as persisted in the `feedback` record and
/// shown to the activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// The response key that was looked up.
    pub key: String,
    pub status: FeedbackStatus,
    pub score: u32,
    /// Rendered message (or the raw key for `not_found`).
    pub message: String,
}

impl FeedbackResult {
    pub fn is_correct(&self) -> bool {
        self.status == FeedbackStatus::Correct
    }
}

/// One part's parsed response: a lookup key plus optional string tags that
/// feedback templates can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResponseKeyRepr", into = "ResponseKeyRepr")]
pub struct ResponseKey {
    pub key: String,
    pub tags: BTreeMap<String, String>,
}

impl ResponseKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Variables available to a feedback template: every tag plus `key`.
    pub fn template_vars(&self) -> BTreeMap<String, String> {
        let mut vars = self.tags.clone();
        vars.insert("key".to_string(), self.key.clone());
        vars
    }
}

impl From<&str> for ResponseKey {
    fn from(key: &str) -> Self {
        ResponseKey::new(key)
    }
}

impl From<String> for ResponseKey {
    fn from(key: String) -> Self {
        ResponseKey::new(key)
    }
}

/// Wire form: a bare string, or `{"key": ..., "<tag>": ...}`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ResponseKeyRepr {
    Bare(String),
    Tagged {
        key: String,
        #[serde(flatten)]
        tags: BTreeMap<String, String>,
    },
}

impl From<ResponseKeyRepr> for ResponseKey {
    fn from(repr: ResponseKeyRepr) -> Self {
        match repr {
            ResponseKeyRepr::Bare(key) => ResponseKey::new(key),
            ResponseKeyRepr::Tagged { key, tags } => ResponseKey { key, tags },
        }
    }
}

impl From<ResponseKey> for ResponseKeyRepr {
    fn from(rk: ResponseKey) -> Self {
        if rk.tags.is_empty() {
            ResponseKeyRepr::Bare(rk.key)
        } else {
            ResponseKeyRepr::Tagged {
                key: rk.key,
                tags: rk.tags,
            }
        }
    }
}

/// An attempt identifier exactly as the host reports it: sometimes `3`,
/// sometimes `"3"`, occasionally something that is not a number at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAttemptId {
    Number(serde_json::Number),
    Text(String),
}

impl From<u32> for RawAttemptId {
    fn from(n: u32) -> Self {
        RawAttemptId::Number(n.into())
    }
}

impl From<&str> for RawAttemptId {
    fn from(s: &str) -> Self {
        RawAttemptId::Text(s.to_string())
    }
}

impl fmt::Display for RawAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAttemptId::Number(n) => write!(f, "{n}"),
            RawAttemptId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A strictly parsed attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(u32);

impl AttemptId {
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Parse a host-reported identifier. Only exact non-negative integers
    /// are accepted: no whitespace, signs, fractions, or exponents.
    pub fn parse(raw: &RawAttemptId) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidAttemptId(raw.to_string());
        match raw {
            RawAttemptId::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(AttemptId)
                .ok_or_else(invalid),
            RawAttemptId::Text(s) => {
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                s.parse::<u32>().map(AttemptId).map_err(|_| invalid())
            }
        }
    }

    /// The attempt immediately before this one, if any.
    pub fn previous(self) -> Option<AttemptId> {
        self.0.checked_sub(1).map(AttemptId)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names of the attempt-scoped records the runner writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordName {
    /// The current response.
    State,
    /// The last graded feedback array.
    Feedback,
    /// Sentinel written before a reset restart.
    Reset,
}

impl RecordName {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordName::State => "state",
            RecordName::Feedback => "feedback",
            RecordName::Reset => "reset",
        }
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the host's session index: a record already written for an
/// attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub attempt: RawAttemptId,
    pub name: String,
}

impl RecordEntry {
    pub fn new(attempt: impl Into<RawAttemptId>, name: impl Into<String>) -> Self {
        Self {
            attempt: attempt.into(),
            name: name.into(),
        }
    }
}

/// The runner's mutable record of the active attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptState<R> {
    pub response: R,
    /// Index-aligned with the question's parts.
    pub feedback: Vec<Option<FeedbackResult>>,
    pub attempt: AttemptId,
    pub completed: bool,
}
