//! Error types for question validation and the attempt runner.
//!
//! Fatal errors (`ValidationError`, `ConfigurationError`) abort before a
//! question renders. Host failures are surfaced through `RunnerError` so the
//! embedding layer can decide whether to retry. Unmatched responses and
//! inconsistent host records are not errors at all: the grading engine and
//! runner degrade them to safe defaults.

use thiserror::Error;

/// A malformed question spec. `at` names the offending location, e.g.
/// `parts[1].match["a"]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The value at `at` must be a JSON object.
    #[error("{at}: expected an object")]
    NotAnObject { at: String },

    /// A field is present but has the wrong JSON type.
    #[error("{at}: field `{field}` must be {expected}")]
    FieldType {
        at: String,
        field: &'static str,
        expected: &'static str,
    },

    /// `parts` was given as an empty array.
    #[error("{at}: field `parts` must be a non-empty array")]
    EmptyParts { at: String },

    /// A `score` field is zero, negative, or not an integer.
    #[error("{at}: field `score` must be a positive integer")]
    InvalidScore { at: String },

    /// The removed single-part schema was used.
    #[error("{at}: the `part` field has been removed; use question-wide properties or a `parts` array")]
    DeprecatedPart { at: String },

    /// A feedback entry is neither a string nor a `[bool|number, string]` pair.
    #[error("{at}: feedback must be a string or a two-element [score, message] array")]
    FeedbackShape { at: String },

    /// The part scores add up to more than a score can hold.
    #[error("{at}: part scores add up to more than {max}; declare `score` or lower the part scores", max = u32::MAX)]
    ScoreOverflow { at: String },

    /// A numeric feedback score lies outside `[0, max]`.
    #[error("{at}: score {score} is outside the allowed range 0..={max}")]
    FeedbackOutOfRange { at: String, score: String, max: u32 },
}

/// The host reported an attempt identifier that is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("attempt identifier {0:?} is not a non-negative integer")]
    InvalidAttemptId(String),
}

/// Failures of a host round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host could not be reached or timed out.
    #[error("host unavailable: {0}")]
    Unavailable(String),

    /// The host refused the request.
    #[error("host rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    /// The record index listed a record the host could not return.
    #[error("record `{name}` missing for attempt {attempt}")]
    MissingRecord { name: String, attempt: u32 },
}

impl HostError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, HostError::Unavailable(_))
    }
}

/// Errors returned by [`AttemptRunner`](crate::runner::AttemptRunner) operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to encode record `{record}`: {source}")]
    Encode {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Submitting is disabled until the attempt is reset.
    #[error("attempt {0} is completed; reset before submitting again")]
    AlreadyCompleted(u32),

    /// The runner task behind a handle has shut down.
    #[error("attempt runner stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_location() {
        let err = ValidationError::FeedbackOutOfRange {
            at: "parts[0].match[\"a\"]".into(),
            score: "7".into(),
            max: 5,
        };
        assert_eq!(
            err.to_string(),
            "parts[0].match[\"a\"]: score 7 is outside the allowed range 0..=5"
        );
    }

    #[test]
    fn deprecated_part_points_to_parts() {
        let err = ValidationError::DeprecatedPart {
            at: "question".into(),
        };
        assert!(err.to_string().contains("use question-wide properties or a `parts` array"));
    }

    #[test]
    fn host_error_classification() {
        assert!(HostError::Unavailable("timeout".into()).is_transient());
        assert!(!HostError::Rejected {
            operation: "scoreAttempt".into(),
            message: "closed".into()
        }
        .is_transient());
    }

    #[test]
    fn runner_error_wraps_configuration() {
        let err: RunnerError = ConfigurationError::InvalidAttemptId("none".into()).into();
        assert_eq!(
            err.to_string(),
            "attempt identifier \"none\" is not a non-negative integer"
        );
    }
}
