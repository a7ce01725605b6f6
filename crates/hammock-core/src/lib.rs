//! hammock-core: question validation, grading, and the attempt runner.
//!
//! This crate turns loosely written question specs into a strict model,
//! grades responses against it, and drives attempts against a host that
//! stores records and accepts scores.

pub mod error;
pub mod grading;
pub mod handle;
pub mod model;
pub mod runner;
pub mod template;
pub mod traits;
pub mod validate;

pub use error::{ConfigurationError, HostError, RunnerError, ValidationError};
pub use handle::RunnerHandle;
pub use model::{AttemptId, FeedbackResult, FeedbackStatus, QuestionModel, ResponseKey};
pub use runner::{AttemptRunner, RunnerConfig, RunnerPhase};
pub use validate::validate_question;
