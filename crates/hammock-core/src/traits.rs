//! Collaborator traits: the host that stores records and scores attempts,
//! and the author-supplied activity that renders and reads responses.
//!
//! The host is implemented by `hammock-host` (and by whatever environment
//! embeds hammock); the activity by question authors.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;
use crate::model::{AttemptId, FeedbackResult, RawAttemptId, RecordEntry, ResponseKey};

// ---------------------------------------------------------------------------
// Host trait
// ---------------------------------------------------------------------------

/// The environment's attempt lifecycle and persistence primitives.
///
/// Every async method is one round trip; the runner awaits each before
/// issuing the next.
#[async_trait]
pub trait Host: Send + Sync {
    /// The attempt the host believes is current. Not trusted until parsed.
    fn current_attempt(&self) -> RawAttemptId;

    /// Records already written, across all attempts.
    fn session_records(&self) -> Vec<RecordEntry>;

    /// Store `content` under `name` for `attempt`.
    async fn write_record(
        &self,
        name: &str,
        mime_type: &str,
        attempt: AttemptId,
        content: &str,
    ) -> Result<(), HostError>;

    /// Load a record; `None` if the host has nothing under that name.
    async fn load_record(&self, name: &str, attempt: AttemptId)
        -> Result<Option<String>, HostError>;

    /// Report the attempt's grade.
    async fn score_attempt(&self, kind: ScoreKind, value: u8) -> Result<(), HostError>;

    async fn end_attempt(&self) -> Result<(), HostError>;

    /// Begin a new attempt and return the host's identifier for it.
    async fn start_attempt(&self) -> Result<RawAttemptId, HostError>;

    /// Telemetry. Best effort: the runner logs and ignores failures.
    async fn log_action(&self, record: &ActionRecord) -> Result<(), HostError>;
}

/// How a score value is expressed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Percent,
}

impl ScoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreKind::Percent => "percent",
        }
    }
}

/// One telemetry record, emitted per graded part on submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: uuid::Uuid,
    /// Action kind, e.g. `EVALUATE_QUESTION`.
    pub action: String,
    /// Step label, e.g. `part1`.
    pub step: String,
    pub attempt: AttemptId,
    /// Whether the part earned full credit.
    pub correct: bool,
    /// The response key that was graded.
    pub key: String,
    pub score: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

// ---------------------------------------------------------------------------
// Activity trait
// ---------------------------------------------------------------------------

/// Author-supplied question logic.
///
/// `init` and `parse` must be pure; `render` must be idempotent and must not
/// depend on earlier calls; `read` only inspects the rendered surface.
pub trait Activity: Send + Sync {
    /// Whatever the activity needs to remember about a student's response.
    type Response: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Draw the question. Called with a fresh view each time.
    fn render(&self, data: &QuestionData<Self::Response>);

    /// Produce a starting response. `previous` is the response being reset
    /// away from, so randomized activities can avoid repeats.
    fn init(&self, previous: Option<&Self::Response>, config: Option<&Value>) -> Self::Response;

    /// Read the student's current response.
    fn read(&self) -> Self::Response;

    /// One entry per part, in part order; `None` for an unanswered part.
    fn parse(&self, response: &Self::Response, config: Option<&Value>)
        -> Vec<Option<ResponseKey>>;
}

/// Read-only view of a question handed to [`Activity::render`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionData<R> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub state: R,
    /// True once the attempt reached 100%; submitting is disabled until reset.
    pub completed: bool,
    pub parts: Vec<PartData>,
}

/// Per-part slice of [`QuestionData`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackResult>,
}
