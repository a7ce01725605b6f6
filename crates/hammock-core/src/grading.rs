//! Response resolution and attempt scoring.
//!
//! A part's response key is looked up in the part's own match table, then in
//! the question-wide table. A key found in neither degrades to a `not_found`
//! result worth zero points rather than an error.

use serde::{Deserialize, Serialize};

use crate::model::{FeedbackResult, FeedbackStatus, QuestionModel, ResponseKey};
use crate::template::Templater;

/// Resolve one part's response into feedback. `None` means the part is
/// unanswered and contributes nothing to the score.
pub fn resolve(
    question: &QuestionModel,
    part_index: usize,
    response: Option<&ResponseKey>,
    templater: &dyn Templater,
) -> Option<FeedbackResult> {
    let response = response?;
    let Some(part) = question.parts.get(part_index) else {
        tracing::debug!(
            "part index {part_index} out of range ({} parts)",
            question.parts.len()
        );
        return None;
    };

    let matched = part
        .matches
        .get(&response.key)
        .or_else(|| question.matches.get(&response.key));

    let Some(matched) = matched else {
        tracing::debug!("part {part_index}: no match for {:?}", response.key);
        return Some(FeedbackResult {
            key: response.key.clone(),
            status: FeedbackStatus::NotFound,
            score: 0,
            message: response.key.clone(),
        });
    };

    let status = if matched.score >= part.score {
        FeedbackStatus::Correct
    } else {
        FeedbackStatus::Incorrect
    };

    Some(FeedbackResult {
        key: response.key.clone(),
        status,
        score: matched.score,
        message: templater.substitute(&matched.message, &response.template_vars()),
    })
}

/// Resolve a whole parse result, one entry per part.
///
/// Missing trailing entries count as unanswered; surplus entries are ignored.
pub fn grade(
    question: &QuestionModel,
    parsed: &[Option<ResponseKey>],
    templater: &dyn Templater,
) -> Vec<Option<FeedbackResult>> {
    if parsed.len() > question.parts.len() {
        tracing::warn!(
            "parse returned {} entries for {} parts; ignoring the extra entries",
            parsed.len(),
            question.parts.len()
        );
    }

    (0..question.parts.len())
        .map(|i| resolve(question, i, parsed.get(i).and_then(Option::as_ref), templater))
        .collect()
}

/// Aggregate points for one graded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub points_earned: u64,
    pub points_available: u64,
    /// `floor(100 * earned / available)`, clamped to `0..=100`.
    pub percentage: u8,
}

impl ScoreSummary {
    pub fn is_complete(&self) -> bool {
        self.percentage == 100
    }
}

/// Score a feedback array against the question's part scores.
pub fn score(question: &QuestionModel, feedback: &[Option<FeedbackResult>]) -> ScoreSummary {
    let points_earned: u64 = feedback.iter().flatten().map(|fb| u64::from(fb.score)).sum();
    let points_available = question.points_available();
    ScoreSummary {
        points_earned,
        points_available,
        percentage: percentage(points_earned, points_available),
    }
}

/// Weighted completion percentage. Question-level fallback entries may award
/// more than a part is worth, hence the clamp.
pub fn percentage(earned: u64, available: u64) -> u8 {
    if available == 0 {
        return 0;
    }
    let pct = (100 * u128::from(earned)) / u128::from(available);
    pct.min(100) as u8
}
