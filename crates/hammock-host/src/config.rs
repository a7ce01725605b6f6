//! Configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use hammock_core::runner::RunnerConfig;

/// Top-level hammock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HammockConfig {
    /// Directory holding question assets.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    /// Question file name inside `content_dir`.
    #[serde(default = "default_question_asset")]
    pub question_asset: String,
    /// Emit per-part telemetry on submit.
    #[serde(default = "default_true")]
    pub telemetry: bool,
    /// Action kind carried by telemetry records.
    #[serde(default = "default_action_kind")]
    pub action_kind: String,
    /// MIME type for record writes.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("./content")
}
fn default_question_asset() -> String {
    "question.json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_action_kind() -> String {
    RunnerConfig::default().action_kind
}
fn default_mime_type() -> String {
    RunnerConfig::default().mime_type
}

impl Default for HammockConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            question_asset: default_question_asset(),
            telemetry: true,
            action_kind: default_action_kind(),
            mime_type: default_mime_type(),
        }
    }
}

impl HammockConfig {
    /// Where the question asset lives.
    pub fn question_path(&self) -> PathBuf {
        self.content_dir.join(&self.question_asset)
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            mime_type: self.mime_type.clone(),
            telemetry: self.telemetry,
            action_kind: self.action_kind.clone(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Substituted values are taken literally, never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `hammock.toml` in the current directory
/// 2. `~/.config/hammock/config.toml`
///
/// Environment variable overrides: `HAMMOCK_CONTENT_DIR`, `HAMMOCK_TELEMETRY`.
pub fn load_config() -> Result<HammockConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<HammockConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("hammock.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => HammockConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("HAMMOCK_CONTENT_DIR") {
        config.content_dir = PathBuf::from(dir);
    }
    if let Ok(flag) = std::env::var("HAMMOCK_TELEMETRY") {
        match parse_flag(&flag) {
            Some(on) => config.telemetry = on,
            None => tracing::warn!("ignoring HAMMOCK_TELEMETRY={flag:?}: not a boolean"),
        }
    }

    config.content_dir = PathBuf::from(resolve_env_vars(&config.content_dir.to_string_lossy()));

    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config_str(content: &str) -> Result<HammockConfig> {
    Ok(toml::from_str::<HammockConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("hammock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_HAMMOCK_TEST_VAR", "assets");
        assert_eq!(resolve_env_vars("${_HAMMOCK_TEST_VAR}"), "assets");
        assert_eq!(
            resolve_env_vars("./${_HAMMOCK_TEST_VAR}/web"),
            "./assets/web"
        );
        std::env::remove_var("_HAMMOCK_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_rescan_values() {
        std::env::set_var("_HAMMOCK_SELF_REF", "${_HAMMOCK_SELF_REF}");
        assert_eq!(
            resolve_env_vars("a/${_HAMMOCK_SELF_REF}/b"),
            "a/${_HAMMOCK_SELF_REF}/b"
        );
        std::env::remove_var("_HAMMOCK_SELF_REF");

        assert_eq!(resolve_env_vars("${_HAMMOCK_UNSET_VAR}x"), "x");
        assert_eq!(resolve_env_vars("open ${brace"), "open ${brace");
    }

    #[test]
    fn default_config() {
        let config = HammockConfig::default();
        assert_eq!(config.question_path(), PathBuf::from("./content/question.json"));
        assert!(config.telemetry);
        assert_eq!(config.runner_config().mime_type, "application/json");
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config_str(
            r#"
content_dir = "web"
telemetry = false
action_kind = "CHECK"
"#,
        )
        .unwrap();
        assert_eq!(config.question_path(), PathBuf::from("web/question.json"));
        let runner = config.runner_config();
        assert!(!runner.telemetry);
        assert_eq!(runner.action_kind, "CHECK");
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hammock.toml");
        std::fs::write(&path, "question_asset = \"q.json\"\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.question_asset, "q.json");

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("Off"), Some(false));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }
}
