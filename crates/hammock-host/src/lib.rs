//! hammock-host: hosts and activities to drive a runner with.
//!
//! Provides an in-memory [`MockHost`], a queue-driven [`ScriptedActivity`],
//! and the TOML configuration the CLI loads.

pub mod config;
pub mod mock_host;
pub mod scripted;

pub use config::{load_config, load_config_from, HammockConfig};
pub use mock_host::{HostCall, HostOp, MockHost};
pub use scripted::{parse_answers, ScriptedActivity, ScriptedResponse};
