//! Claude Code agent provider
//!
//! Invokes the Claude CLI in print mode:
//! ```bash
//! claude -p [--dangerously-skip-permissions] [--model NAME] --output-format text
//! ```
//!
//! The prompt is piped via stdin. Write access is granted by the
//! skip-permissions flag and only for phases that need it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{AccessMode, AgentProvider, ModelClass};
use crate::config::AgentConfig;

/// Claude Code CLI agent provider
pub struct ClaudeProvider {
    config: AgentConfig,
}

impl ClaudeProvider {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    fn model_for(&self, class: ModelClass) -> Option<&str> {
        match class {
            ModelClass::Primary => self.config.primary_model.as_deref(),
            ModelClass::Deep => self
                .config
                .deep_model
                .as_deref()
                .or(self.config.primary_model.as_deref()),
        }
    }
}

#[async_trait]
impl AgentProvider for ClaudeProvider {
    fn name(&self) -> &'static str {
        "Claude"
    }

    async fn invoke(
        &self,
        project_dir: &Path,
        prompt: &str,
        model: ModelClass,
        access: AccessMode,
    ) -> Result<String> {
        let agent_path = &self.config.path;
        info!("Running agent: {} ({:?} model class)", agent_path, model);
        debug!("Project dir: {}", project_dir.display());

        let mut args = vec!["-p".to_string()];

        if access == AccessMode::WriteEnabled {
            args.push("--dangerously-skip-permissions".to_string());
        }

        if let Some(model) = self.model_for(model) {
            args.push("--model".to_string());
            args.push(model.to_string());
        }

        args.push("--output-format".to_string());
        args.push(self.config.output_format.clone());

        debug!("Agent args: {:?}", args);

        let mut child = tokio::process::Command::new(agent_path)
            .current_dir(project_dir)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to run agent '{}'.\n\
                     \n\
                     Make sure the Claude Code CLI is installed:\n\
                     - npm install -g @anthropic-ai/claude-code\n\
                     \n\
                     Or configure the path in cadence.toml:\n\
                     [agent]\n\
                     path = \"/full/path/to/claude\"",
                    agent_path
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.flush().await?;
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        // A failing or silent agent is not an error at this boundary; the
        // loop's timing heuristic is the failure signal.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "Agent exited with {:?}; continuing. stderr: {}",
                output.status.code(),
                stderr.trim()
            );
        } else if stdout.trim().is_empty() {
            warn!("Agent produced no output");
        }

        debug!("Output length: {} bytes", stdout.len());
        Ok(stdout)
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.config.path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = ClaudeProvider::new(AgentConfig::default());
        assert_eq!(provider.name(), "Claude");
    }

    #[test]
    fn test_deep_model_falls_back_to_primary() {
        let config = AgentConfig {
            primary_model: Some("sonnet".to_string()),
            deep_model: None,
            ..AgentConfig::default()
        };
        let provider = ClaudeProvider::new(config);
        assert_eq!(provider.model_for(ModelClass::Deep), Some("sonnet"));
    }

    #[test]
    fn test_model_selection_per_class() {
        let config = AgentConfig {
            primary_model: Some("sonnet".to_string()),
            deep_model: Some("opus".to_string()),
            ..AgentConfig::default()
        };
        let provider = ClaudeProvider::new(config);
        assert_eq!(provider.model_for(ModelClass::Primary), Some("sonnet"));
        assert_eq!(provider.model_for(ModelClass::Deep), Some("opus"));
    }
}
