//! In-memory host for testing and simulation.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use hammock_core::error::HostError;
use hammock_core::model::{AttemptId, RawAttemptId, RecordEntry};
use hammock_core::traits::{ActionRecord, Host, ScoreKind};

/// A host operation, for journaling and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    WriteRecord,
    LoadRecord,
    ScoreAttempt,
    EndAttempt,
    StartAttempt,
    LogAction,
}

/// One call received by a [`MockHost`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    WriteRecord { name: String, attempt: u32 },
    LoadRecord { name: String, attempt: u32 },
    ScoreAttempt(u8),
    EndAttempt,
    StartAttempt,
    LogAction { step: String },
}

impl std::fmt::Display for HostCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostCall::WriteRecord { name, attempt } => write!(f, "write {name}@{attempt}"),
            HostCall::LoadRecord { name, attempt } => write!(f, "load {name}@{attempt}"),
            HostCall::ScoreAttempt(pct) => write!(f, "score {pct}%"),
            HostCall::EndAttempt => write!(f, "end attempt"),
            HostCall::StartAttempt => write!(f, "start attempt"),
            HostCall::LogAction { step } => write!(f, "log {step}"),
        }
    }
}

#[derive(Debug)]
struct HostState {
    current_attempt: u32,
    records: BTreeMap<(u32, String), String>,
    calls: Vec<HostCall>,
    actions: Vec<ActionRecord>,
    failing: HashSet<HostOp>,
    /// Report attempt ids as strings, the way some hosts do.
    string_ids: bool,
    /// Overrides the id returned by the next `start_attempt`.
    next_start_override: Option<RawAttemptId>,
    /// Overrides what `current_attempt` reports.
    current_override: Option<RawAttemptId>,
}

/// A host that keeps records in memory and journals every call.
///
/// Round trips yield to the scheduler, so they are real suspension points.
#[derive(Debug)]
pub struct MockHost {
    state: Mutex<HostState>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    /// A host on attempt 1 with nothing saved.
    pub fn new() -> Self {
        Self::at_attempt(1)
    }

    pub fn at_attempt(attempt: u32) -> Self {
        Self {
            state: Mutex::new(HostState {
                current_attempt: attempt,
                records: BTreeMap::new(),
                calls: Vec::new(),
                actions: Vec::new(),
                failing: HashSet::new(),
                string_ids: false,
                next_start_override: None,
                current_override: None,
            }),
        }
    }

    /// Seed a record as if an earlier visit had written it.
    pub fn with_record(self, attempt: u32, name: &str, content: &str) -> Self {
        self.lock()
            .records
            .insert((attempt, name.to_string()), content.to_string());
        self
    }

    /// Report attempt ids as JSON strings instead of numbers.
    pub fn with_string_ids(self) -> Self {
        self.lock().string_ids = true;
        self
    }

    /// Report `raw` as the current attempt, whatever it is.
    pub fn with_current_attempt_raw(self, raw: RawAttemptId) -> Self {
        self.lock().current_override = Some(raw);
        self
    }

    /// Make every call of `op` fail with [`HostError::Unavailable`].
    pub fn fail_on(&self, op: HostOp) {
        self.lock().failing.insert(op);
    }

    pub fn recover_op(&self, op: HostOp) {
        self.lock().failing.remove(&op);
    }

    /// Return `raw` from the next `start_attempt` instead of the next number.
    pub fn override_next_start(&self, raw: RawAttemptId) {
        self.lock().next_start_override = Some(raw);
    }

    /// A new host with the same records and attempt, as a page reload sees it.
    pub fn reopen(&self) -> Self {
        let state = self.lock();
        Self {
            state: Mutex::new(HostState {
                current_attempt: state.current_attempt,
                records: state.records.clone(),
                calls: Vec::new(),
                actions: Vec::new(),
                failing: HashSet::new(),
                string_ids: state.string_ids,
                next_start_override: None,
                current_override: None,
            }),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.lock().actions.clone()
    }

    /// Every score reported so far.
    pub fn scores(&self) -> Vec<u8> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                HostCall::ScoreAttempt(pct) => Some(*pct),
                _ => None,
            })
            .collect()
    }

    pub fn record(&self, attempt: u32, name: &str) -> Option<String> {
        self.lock().records.get(&(attempt, name.to_string())).cloned()
    }

    pub fn attempt(&self) -> u32 {
        self.lock().current_attempt
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raw_id(state: &HostState, attempt: u32) -> RawAttemptId {
        if state.string_ids {
            RawAttemptId::Text(attempt.to_string())
        } else {
            RawAttemptId::from(attempt)
        }
    }

    /// Journal `call` and fail it if `op` is marked failing.
    async fn round_trip(&self, op: HostOp, call: HostCall) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        let mut state = self.lock();
        state.calls.push(call.clone());
        if state.failing.contains(&op) {
            tracing::debug!("mock host failing {call}");
            return Err(HostError::Unavailable(format!("{call} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl Host for MockHost {
    fn current_attempt(&self) -> RawAttemptId {
        let state = self.lock();
        match &state.current_override {
            Some(raw) => raw.clone(),
            None => Self::raw_id(&state, state.current_attempt),
        }
    }

    fn session_records(&self) -> Vec<RecordEntry> {
        let state = self.lock();
        state
            .records
            .keys()
            .map(|(attempt, name)| RecordEntry {
                attempt: Self::raw_id(&state, *attempt),
                name: name.clone(),
            })
            .collect()
    }

    async fn write_record(
        &self,
        name: &str,
        _mime_type: &str,
        attempt: AttemptId,
        content: &str,
    ) -> Result<(), HostError> {
        let call = HostCall::WriteRecord {
            name: name.to_string(),
            attempt: attempt.get(),
        };
        self.round_trip(HostOp::WriteRecord, call).await?;
        self.lock()
            .records
            .insert((attempt.get(), name.to_string()), content.to_string());
        Ok(())
    }

    async fn load_record(
        &self,
        name: &str,
        attempt: AttemptId,
    ) -> Result<Option<String>, HostError> {
        let call = HostCall::LoadRecord {
            name: name.to_string(),
            attempt: attempt.get(),
        };
        self.round_trip(HostOp::LoadRecord, call).await?;
        Ok(self.record(attempt.get(), name))
    }

    async fn score_attempt(&self, kind: ScoreKind, value: u8) -> Result<(), HostError> {
        tracing::debug!("mock host scored {value} ({})", kind.as_str());
        self.round_trip(HostOp::ScoreAttempt, HostCall::ScoreAttempt(value))
            .await
    }

    async fn end_attempt(&self) -> Result<(), HostError> {
        self.round_trip(HostOp::EndAttempt, HostCall::EndAttempt)
            .await
    }

    async fn start_attempt(&self) -> Result<RawAttemptId, HostError> {
        self.round_trip(HostOp::StartAttempt, HostCall::StartAttempt)
            .await?;
        let mut state = self.lock();
        state.current_attempt += 1;
        let raw = match state.next_start_override.take() {
            Some(raw) => raw,
            None => Self::raw_id(&state, state.current_attempt),
        };
        Ok(raw)
    }

    async fn log_action(&self, record: &ActionRecord) -> Result<(), HostError> {
        let call = HostCall::LogAction {
            step: record.step.clone(),
        };
        self.round_trip(HostOp::LogAction, call).await?;
        self.lock().actions.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_round_trip_and_are_indexed() {
        let host = MockHost::new();
        host.write_record("state", "application/json", AttemptId::new(1), "{}")
            .await
            .unwrap();

        let loaded = host.load_record("state", AttemptId::new(1)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some("{}"));
        assert_eq!(host.session_records(), vec![RecordEntry::new(1u32, "state")]);
        assert_eq!(
            host.calls(),
            vec![
                HostCall::WriteRecord { name: "state".into(), attempt: 1 },
                HostCall::LoadRecord { name: "state".into(), attempt: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn start_attempt_advances() {
        let host = MockHost::at_attempt(4).with_string_ids();
        assert_eq!(host.current_attempt(), RawAttemptId::Text("4".into()));
        host.end_attempt().await.unwrap();
        let raw = host.start_attempt().await.unwrap();
        assert_eq!(raw, RawAttemptId::Text("5".into()));
        assert_eq!(host.attempt(), 5);
    }

    #[tokio::test]
    async fn injected_failures_are_journaled() {
        let host = MockHost::new();
        host.fail_on(HostOp::ScoreAttempt);
        let err = host.score_attempt(ScoreKind::Percent, 50).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(host.scores(), vec![50]);

        host.recover_op(HostOp::ScoreAttempt);
        assert!(host.score_attempt(ScoreKind::Percent, 60).await.is_ok());
    }

    #[test]
    fn reopen_keeps_records_not_calls() {
        let host = MockHost::at_attempt(2).with_record(1, "feedback", "[]");
        host.lock().calls.push(HostCall::EndAttempt);
        let reopened = host.reopen();
        assert_eq!(reopened.attempt(), 2);
        assert_eq!(reopened.record(1, "feedback").as_deref(), Some("[]"));
        assert!(reopened.calls().is_empty());
    }
}
