//! The attempt runner: recovery, submit, and reset against a host.
//!
//! A runner owns the only mutable state in the system, the current
//! [`AttemptState`]. Every operation takes `&mut self`, so one owner can never
//! interleave two operations; [`RunnerHandle`](crate::handle::RunnerHandle)
//! extends that ordering to many callers.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized -> Loading -> Ready <-> Submitting -> (Ready | Completed)
//!                             Ready | Completed -> Resetting -> Ready
//! ```
//!
//! Operations build the next `AttemptState` and commit it only after every
//! host round trip has succeeded. Host writes always go `state`, then
//! `feedback`, then score, then any restart: recovery decides what to load
//! from which records exist, so that order matters.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigurationError, HostError, RunnerError};
use crate::grading::{self, ScoreSummary};
use crate::model::{AttemptId, AttemptState, FeedbackResult, QuestionModel, RecordEntry, RecordName};
use crate::template::{BraceTemplater, Templater};
use crate::traits::{ActionRecord, Activity, Host, PartData, QuestionData, ScoreKind};

/// Configuration for the attempt runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// MIME type sent with every record write.
    pub mime_type: String,
    /// Emit one telemetry record per graded part on submit.
    pub telemetry: bool,
    /// Action kind carried by telemetry records.
    pub action_kind: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mime_type: "application/json".to_string(),
            telemetry: true,
            action_kind: "EVALUATE_QUESTION".to_string(),
        }
    }
}

/// Where a runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Uninitialized,
    Loading,
    Ready,
    Submitting,
    Completed,
    Resetting,
}

impl fmt::Display for RunnerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerPhase::Uninitialized => "uninitialized",
            RunnerPhase::Loading => "loading",
            RunnerPhase::Ready => "ready",
            RunnerPhase::Submitting => "submitting",
            RunnerPhase::Completed => "completed",
            RunnerPhase::Resetting => "resetting",
        };
        f.write_str(name)
    }
}

/// Drives one question through its attempts.
pub struct AttemptRunner<A: Activity> {
    question: Arc<QuestionModel>,
    host: Arc<dyn Host>,
    activity: Arc<A>,
    templater: Box<dyn Templater>,
    config: RunnerConfig,
    records: RecordIndex,
    phase: RunnerPhase,
    /// The host's attempt at construction; superseded by `state` once recovered.
    initial_attempt: AttemptId,
    state: Option<AttemptState<A::Response>>,
}

impl<A: Activity> AttemptRunner<A> {
    /// Create a runner for the host's current attempt.
    ///
    /// Fails before touching any state if the host's attempt identifier is
    /// not an integer. Recovery of saved records happens on the first
    /// operation (or an explicit [`recover`](Self::recover)).
    pub fn new(
        question: Arc<QuestionModel>,
        host: Arc<dyn Host>,
        activity: Arc<A>,
        config: RunnerConfig,
    ) -> Result<Self, ConfigurationError> {
        let initial_attempt = AttemptId::parse(&host.current_attempt())?;
        let records = RecordIndex::build(&host.session_records());

        Ok(Self {
            question,
            host,
            activity,
            templater: Box::new(BraceTemplater),
            config,
            records,
            phase: RunnerPhase::Uninitialized,
            initial_attempt,
            state: None,
        })
    }

    /// Use a different feedback template renderer.
    pub fn with_templater(mut self, templater: Box<dyn Templater>) -> Self {
        self.templater = templater;
        self
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    /// The attempt all record writes currently target.
    pub fn attempt(&self) -> AttemptId {
        self.state
            .as_ref()
            .map(|s| s.attempt)
            .unwrap_or(self.initial_attempt)
    }

    /// The committed attempt state, once recovered.
    pub fn state(&self) -> Option<&AttemptState<A::Response>> {
        self.state.as_ref()
    }

    pub fn question(&self) -> &QuestionModel {
        &self.question
    }

    /// Load saved records for the current attempt. Idempotent; every other
    /// operation calls this first.
    pub async fn recover(&mut self) -> Result<(), RunnerError> {
        self.settled().await.map(drop)
    }

    /// Hand a fresh view of the question to the activity.
    pub async fn render(&mut self) -> Result<(), RunnerError> {
        let data = self.question_data().await?;
        self.activity.render(&data);
        Ok(())
    }

    /// Build the view the activity would be rendered with. Hints and
    /// feedback are copies; nothing the renderer does reaches the model.
    pub async fn question_data(&mut self) -> Result<QuestionData<A::Response>, RunnerError> {
        let state = self.settled().await?;
        Ok(build_view(&self.question, state))
    }

    /// Grade the activity's current response, persist it, and report the
    /// score. A perfect score completes the attempt and starts a new one.
    pub async fn submit(&mut self) -> Result<ScoreSummary, RunnerError> {
        let current = self.settled().await?;
        if current.completed {
            return Err(RunnerError::AlreadyCompleted(current.attempt.get()));
        }

        let resume = self.phase;
        self.phase = RunnerPhase::Submitting;
        match self.submit_from(current).await {
            Ok((next, summary)) => {
                self.phase = if next.completed {
                    RunnerPhase::Completed
                } else {
                    RunnerPhase::Ready
                };
                self.state = Some(next);
                Ok(summary)
            }
            Err(e) => {
                self.phase = resume;
                Err(e)
            }
        }
    }

    /// Start over with a freshly initialized response in a new attempt.
    pub async fn reset(&mut self) -> Result<(), RunnerError> {
        let current = self.settled().await?;

        let resume = self.phase;
        self.phase = RunnerPhase::Resetting;
        match self.reset_from(current).await {
            Ok(next) => {
                self.state = Some(next);
                self.phase = RunnerPhase::Ready;
                Ok(())
            }
            Err(e) => {
                self.phase = resume;
                Err(e)
            }
        }
    }

    /// Snapshot of the committed state, recovering it first if needed.
    async fn settled(&mut self) -> Result<AttemptState<A::Response>, RunnerError> {
        if let Some(state) = &self.state {
            return Ok(state.clone());
        }

        self.phase = RunnerPhase::Loading;
        match self.recover_state().await {
            Ok(state) => {
                self.phase = RunnerPhase::Ready;
                self.state = Some(state.clone());
                Ok(state)
            }
            Err(e) => {
                self.phase = RunnerPhase::Uninitialized;
                Err(e)
            }
        }
    }

    async fn recover_state(&self) -> Result<AttemptState<A::Response>, RunnerError> {
        let attempt = self.initial_attempt;
        let plan = RecoveryPlan::classify(&self.records, attempt);
        tracing::debug!("recovering attempt {attempt}: {plan:?}");

        let feedback_from = match plan {
            RecoveryPlan::Fresh => return Ok(self.fresh_state(attempt)),
            RecoveryPlan::Anomalous => {
                tracing::warn!(
                    "attempt {attempt} has a saved state but no feedback or reset record; starting fresh"
                );
                return Ok(self.fresh_state(attempt));
            }
            RecoveryPlan::Restore { feedback_from } => feedback_from,
        };

        let state_load = self.load_json::<A::Response>(RecordName::State, attempt);
        let feedback_load = async {
            match feedback_from {
                Some(from) => {
                    self.load_json::<Vec<Option<FeedbackResult>>>(RecordName::Feedback, from)
                        .await
                }
                None => Ok(None),
            }
        };
        let (response, feedback) = futures::join!(state_load, feedback_load);

        let Some(response) = response? else {
            return Ok(self.fresh_state(attempt));
        };

        let parts = self.question.parts.len();
        let feedback = match feedback? {
            Some(fb) if fb.len() == parts => fb,
            Some(fb) => {
                tracing::warn!(
                    "saved feedback has {} entries for {parts} parts; discarding it",
                    fb.len()
                );
                vec![None; parts]
            }
            None => vec![None; parts],
        };

        Ok(AttemptState {
            response,
            feedback,
            attempt,
            completed: false,
        })
    }

    fn fresh_state(&self, attempt: AttemptId) -> AttemptState<A::Response> {
        AttemptState {
            response: self.activity.init(None, self.question.config.as_ref()),
            feedback: vec![None; self.question.parts.len()],
            attempt,
            completed: false,
        }
    }

    /// Load and decode a record. Missing or undecodable records are host
    /// anomalies: logged and reported as absent.
    async fn load_json<T: DeserializeOwned>(
        &self,
        name: RecordName,
        attempt: AttemptId,
    ) -> Result<Option<T>, RunnerError> {
        let content = match self.host.load_record(name.as_str(), attempt).await {
            Ok(Some(content)) => content,
            Ok(None) | Err(HostError::MissingRecord { .. }) => {
                tracing::warn!("record `{name}` for attempt {attempt} is indexed but empty");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("record `{name}` for attempt {attempt} does not decode: {e}");
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(
        &self,
        name: RecordName,
        attempt: AttemptId,
        value: &T,
    ) -> Result<(), RunnerError> {
        let content = serde_json::to_string(value).map_err(|source| RunnerError::Encode {
            record: name.as_str(),
            source,
        })?;
        self.host
            .write_record(name.as_str(), &self.config.mime_type, attempt, &content)
            .await?;
        Ok(())
    }

    async fn submit_from(
        &self,
        current: AttemptState<A::Response>,
    ) -> Result<(AttemptState<A::Response>, ScoreSummary), RunnerError> {
        let config = self.question.config.as_ref();
        let response = self.activity.read();
        let parsed = self.activity.parse(&response, config);
        let feedback = grading::grade(&self.question, &parsed, self.templater.as_ref());
        let summary = grading::score(&self.question, &feedback);

        self.log_actions(current.attempt, &feedback).await;

        self.write_json(RecordName::State, current.attempt, &response)
            .await?;
        self.write_json(RecordName::Feedback, current.attempt, &feedback)
            .await?;
        self.host
            .score_attempt(ScoreKind::Percent, summary.percentage)
            .await?;
        tracing::info!(
            "attempt {}: recorded {}% ({}/{} points)",
            current.attempt,
            summary.percentage,
            summary.points_earned,
            summary.points_available
        );

        let (attempt, completed) = if summary.is_complete() {
            (self.restart().await?, true)
        } else {
            (current.attempt, false)
        };

        Ok((
            AttemptState {
                response,
                feedback,
                attempt,
                completed,
            },
            summary,
        ))
    }

    async fn reset_from(
        &self,
        current: AttemptState<A::Response>,
    ) -> Result<AttemptState<A::Response>, RunnerError> {
        let response = self
            .activity
            .init(Some(&current.response), self.question.config.as_ref());

        self.write_json(RecordName::Reset, current.attempt, &response)
            .await?;
        let attempt = self.restart().await?;
        self.write_json(RecordName::State, attempt, &response)
            .await?;

        Ok(AttemptState {
            response,
            feedback: vec![None; self.question.parts.len()],
            attempt,
            completed: false,
        })
    }

    /// End the current attempt and adopt the id of the one the host starts.
    async fn restart(&self) -> Result<AttemptId, RunnerError> {
        self.host.end_attempt().await?;
        let raw = self.host.start_attempt().await?;
        let attempt = AttemptId::parse(&raw)?;
        tracing::info!("started attempt {attempt}");
        Ok(attempt)
    }

    /// Fire one telemetry record per graded part and wait for all of them.
    /// Failures are logged, never propagated.
    async fn log_actions(&self, attempt: AttemptId, feedback: &[Option<FeedbackResult>]) {
        if !self.config.telemetry {
            return;
        }

        let now = chrono::Utc::now();
        let records: Vec<ActionRecord> = feedback
            .iter()
            .enumerate()
            .filter_map(|(i, fb)| {
                fb.as_ref().map(|fb| ActionRecord {
                    id: uuid::Uuid::new_v4(),
                    action: self.config.action_kind.clone(),
                    step: format!("part{}", i + 1),
                    attempt,
                    correct: fb.is_correct(),
                    key: fb.key.clone(),
                    score: fb.score,
                    timestamp: now,
                })
            })
            .collect();

        let results = join_all(records.iter().map(|r| self.host.log_action(r))).await;
        for (record, result) in records.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!("telemetry for {} not recorded: {e}", record.step);
            }
        }
    }
}

fn build_view<R: Clone>(question: &QuestionModel, state: AttemptState<R>) -> QuestionData<R> {
    let parts = question
        .parts
        .iter()
        .enumerate()
        .map(|(i, part)| PartData {
            prompt: part.prompt.clone(),
            hints: part.hints.clone(),
            config: part.config.clone(),
            feedback: state.feedback.get(i).cloned().flatten(),
        })
        .collect();

    QuestionData {
        prompt: question.prompt.clone(),
        hints: question.hints.clone(),
        config: question.config.clone(),
        state: state.response,
        completed: state.completed,
        parts,
    }
}

/// Which record names the host reported for which attempts.
#[derive(Debug, Default)]
struct RecordIndex {
    by_attempt: HashMap<AttemptId, HashSet<String>>,
}

impl RecordIndex {
    fn build(entries: &[RecordEntry]) -> Self {
        let mut by_attempt: HashMap<AttemptId, HashSet<String>> = HashMap::new();
        for entry in entries {
            match AttemptId::parse(&entry.attempt) {
                Ok(attempt) => {
                    by_attempt
                        .entry(attempt)
                        .or_default()
                        .insert(entry.name.clone());
                }
                Err(e) => tracing::warn!("ignoring record `{}`: {e}", entry.name),
            }
        }
        Self { by_attempt }
    }

    fn has(&self, attempt: AttemptId, name: RecordName) -> bool {
        self.by_attempt
            .get(&attempt)
            .is_some_and(|names| names.contains(name.as_str()))
    }

    fn any_before(&self, attempt: AttemptId) -> bool {
        self.by_attempt.keys().any(|a| *a < attempt)
    }
}

/// What recovery should do, decided from record presence alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryPlan {
    /// Nothing saved for this attempt: initialize a new response.
    Fresh,
    /// Load `state`, plus `feedback` from the given attempt if any.
    Restore { feedback_from: Option<AttemptId> },
    /// A saved state with no way to explain it: start fresh.
    Anomalous,
}

impl RecoveryPlan {
    fn classify(records: &RecordIndex, attempt: AttemptId) -> Self {
        if !records.has(attempt, RecordName::State) {
            return RecoveryPlan::Fresh;
        }

        let previous = attempt.previous();
        let after_reset = previous.is_some_and(|p| records.has(p, RecordName::Reset));
        let feedback_from = if records.has(attempt, RecordName::Feedback) {
            Some(attempt)
        } else if after_reset {
            None
        } else {
            previous.filter(|p| records.has(*p, RecordName::Feedback))
        };

        let first_attempt = !records.any_before(attempt);
        if feedback_from.is_none() && !first_attempt && !after_reset {
            return RecoveryPlan::Anomalous;
        }

        RecoveryPlan::Restore { feedback_from }
    }
}
