use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "cadence.toml";

/// Directory (relative to the project root) holding loop state, the session
/// snapshot, auto-commit config, and log artifacts.
pub const STATE_DIR: &str = ".cadence";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub reviewer: ReviewerConfig,
    #[serde(default, rename = "loop")]
    pub loop_cfg: LoopConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Primary agent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Path to the agent CLI binary.
    #[serde(default = "default_agent_path")]
    pub path: String,

    /// Model used for ordinary iterations (agent default if unset).
    #[serde(default)]
    pub primary_model: Option<String>,

    /// Model used for deep-planning iterations.
    #[serde(default = "default_deep_model")]
    pub deep_model: Option<String>,

    /// Output format for non-interactive invocations.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            path: default_agent_path(),
            primary_model: None,
            deep_model: default_deep_model(),
            output_format: default_output_format(),
        }
    }
}

fn default_agent_path() -> String {
    "claude".to_string()
}

fn default_deep_model() -> Option<String> {
    Some("opus".to_string())
}

fn default_output_format() -> String {
    "text".to_string()
}

/// Secondary reviewer configuration. The reviewer is advisory and optional:
/// when the tool is not installed the loop degrades to a placeholder log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerConfig {
    /// Run the background review pass at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path to the reviewer CLI binary.
    #[serde(default = "default_reviewer_path")]
    pub path: String,

    /// Model to use (reviewer's default if unset).
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_reviewer_path(),
            model: None,
        }
    }
}

fn default_reviewer_path() -> String {
    "codex".to_string()
}

/// Loop tuning. The defaults encode the failure heuristic: an iteration
/// finishing under the floor counts as suspiciously fast, and three in a row
/// terminate the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Plan document consumed by the task source.
    #[serde(default = "default_plan_file")]
    pub plan_file: String,

    /// Iterations faster than this are treated as failure-loop candidates.
    #[serde(default = "default_fast_floor")]
    pub fast_floor_secs: u64,

    /// Backoff applied per consecutive fast iteration.
    #[serde(default = "default_backoff_step")]
    pub backoff_step_secs: u64,

    /// Consecutive fast iterations before the loop gives up.
    #[serde(default = "default_max_fast")]
    pub max_consecutive_fast: u32,

    /// Every Nth iteration runs with the deep model class.
    #[serde(default = "default_deep_interval")]
    pub deep_interval: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            plan_file: default_plan_file(),
            fast_floor_secs: default_fast_floor(),
            backoff_step_secs: default_backoff_step(),
            max_consecutive_fast: default_max_fast(),
            deep_interval: default_deep_interval(),
        }
    }
}

fn default_plan_file() -> String {
    "PLAN.md".to_string()
}

fn default_fast_floor() -> u64 {
    300
}

fn default_backoff_step() -> u64 {
    60
}

fn default_max_fast() -> u32 {
    3
}

fn default_deep_interval() -> u32 {
    4
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notification target when the loop completes ("webhook:<url>",
    /// "desktop", or "none").
    #[serde(default)]
    pub on_complete: Option<String>,

    /// Notification target when the loop hits failure mode.
    #[serde(default)]
    pub on_error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file, using defaults if not found
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.path, "claude");
        assert_eq!(config.agent.deep_model.as_deref(), Some("opus"));
        assert!(config.reviewer.enabled);
        assert_eq!(config.loop_cfg.fast_floor_secs, 300);
        assert_eq!(config.loop_cfg.backoff_step_secs, 60);
        assert_eq!(config.loop_cfg.max_consecutive_fast, 3);
        assert_eq!(config.loop_cfg.deep_interval, 4);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[agent]
path = "/usr/bin/claude"
primary_model = "sonnet"

[reviewer]
enabled = false

[loop]
plan_file = "TODO.md"
fast_floor_secs = 120

[notifications]
on_error = "desktop"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.agent.path, "/usr/bin/claude");
        assert_eq!(config.agent.primary_model.as_deref(), Some("sonnet"));
        assert!(!config.reviewer.enabled);
        assert_eq!(config.loop_cfg.plan_file, "TODO.md");
        assert_eq!(config.loop_cfg.fast_floor_secs, 120);
        // Unset fields keep their defaults.
        assert_eq!(config.loop_cfg.backoff_step_secs, 60);
        assert_eq!(config.notifications.on_error.as_deref(), Some("desktop"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.loop_cfg.plan_file, "PLAN.md");
    }
}
