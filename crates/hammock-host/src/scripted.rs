//! A scripted activity: answers are queued up front instead of typed.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use hammock_core::model::ResponseKey;
use hammock_core::traits::{Activity, QuestionData};

/// The response a [`ScriptedActivity`] keeps between visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedResponse {
    /// Bumped by every `init` that starts from a previous response.
    pub generation: u32,
    /// One entry per part; `None` is unanswered.
    pub answers: Vec<Option<ResponseKey>>,
}

#[derive(Debug, Default)]
struct Surface {
    /// What the last render showed.
    shown: ScriptedResponse,
    queued: VecDeque<Vec<Option<ResponseKey>>>,
    renders: Vec<Value>,
    init_calls: Vec<Option<ScriptedResponse>>,
}

/// An [`Activity`] whose "student" answers from a queue.
///
/// `read` takes the last rendered response and replaces its answers with the
/// next queued set, the way a student edits what is on screen.
#[derive(Debug, Default)]
pub struct ScriptedActivity {
    surface: Mutex<Surface>,
}

impl ScriptedActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answers the next `read` will see.
    pub fn answer(&self, answers: Vec<Option<ResponseKey>>) {
        self.lock().queued.push_back(answers);
    }

    /// Every view rendered so far, as JSON.
    pub fn renders(&self) -> Vec<Value> {
        self.lock().renders.clone()
    }

    /// The `previous` argument of every `init` call.
    pub fn init_calls(&self) -> Vec<Option<ScriptedResponse>> {
        self.lock().init_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Surface> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Activity for ScriptedActivity {
    type Response = ScriptedResponse;

    fn render(&self, data: &QuestionData<ScriptedResponse>) {
        let mut surface = self.lock();
        surface.shown = data.state.clone();
        match serde_json::to_value(data) {
            Ok(view) => surface.renders.push(view),
            Err(e) => tracing::warn!("scripted render could not record view: {e}"),
        }
    }

    fn init(&self, previous: Option<&ScriptedResponse>, _config: Option<&Value>) -> ScriptedResponse {
        self.lock().init_calls.push(previous.cloned());
        ScriptedResponse {
            generation: previous.map_or(0, |p| p.generation + 1),
            answers: Vec::new(),
        }
    }

    fn read(&self) -> ScriptedResponse {
        let mut surface = self.lock();
        let mut response = surface.shown.clone();
        if let Some(answers) = surface.queued.pop_front() {
            response.answers = answers;
        }
        response
    }

    fn parse(&self, response: &ScriptedResponse, _config: Option<&Value>) -> Vec<Option<ResponseKey>> {
        response.answers.clone()
    }
}

/// Parse a comma-separated answer list: `a,-,b{value=3}`. `-` or an empty
/// entry is unanswered; `key{tag=value;tag=value}` attaches tags.
pub fn parse_answers(spec: &str) -> anyhow::Result<Vec<Option<ResponseKey>>> {
    spec.split(',')
        .map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() || entry == "-" {
                return Ok(None);
            }
            let Some((key, rest)) = entry.split_once('{') else {
                return Ok(Some(ResponseKey::new(entry)));
            };
            let tags = rest
                .strip_suffix('}')
                .ok_or_else(|| anyhow::anyhow!("unterminated tag list in {entry:?}"))?;
            let mut rk = ResponseKey::new(key.trim());
            for tag in tags.split(';').filter(|t| !t.trim().is_empty()) {
                let (name, value) = tag
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("tag {tag:?} is not name=value"))?;
                rk = rk.with_tag(name.trim(), value.trim());
            }
            Ok(Some(rk))
        })
        .collect()
}
