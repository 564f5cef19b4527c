//! Agent invocation boundary.
//!
//! An agent is an opaque text-in/text-out CLI invoked once per phase. Its
//! exit code is informational only: a non-zero exit or empty transcript is
//! not an error here, because a degraded upstream service is detected
//! downstream through iteration timing, not through exit status. Only a
//! spawn failure (binary missing) surfaces as `Err`.

mod claude;
#[cfg(test)]
mod mock;

pub(crate) use claude::ClaudeProvider;
#[cfg(test)]
pub(crate) use mock::MockProvider;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::logs::{self, Phase};

/// Model capability tier for one invocation. `Deep` is selected for the
/// periodic architecture-reconsideration iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelClass {
    Primary,
    Deep,
}

/// Whether the invocation is granted unattended write access to the working
/// tree. Implementation and verification need it; planning does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteEnabled,
}

/// Result of one agent invocation.
#[derive(Debug)]
pub struct Invocation {
    /// Full transcript, possibly empty.
    pub output: String,
    /// Artifact the transcript was written to.
    pub log_path: PathBuf,
    /// Wall-clock duration of the external call.
    pub duration: Duration,
}

/// Trait for agent CLI providers.
#[async_trait]
pub(crate) trait AgentProvider: Send + Sync {
    /// Returns the provider name for display.
    fn name(&self) -> &'static str;

    /// Invokes the agent and returns the full transcript. Must not fail on
    /// a non-zero exit; only on failure to start the process at all.
    async fn invoke(
        &self,
        project_dir: &Path,
        prompt: &str,
        model: ModelClass,
        access: AccessMode,
    ) -> Result<String>;

    /// Whether the underlying tool appears to be installed.
    async fn is_available(&self) -> bool;
}

/// Wraps a provider with timing and artifact capture. One blocking call per
/// phase; the transcript lands in its log artifact before this returns.
pub(crate) struct AgentInvoker {
    provider: Box<dyn AgentProvider>,
}

impl AgentInvoker {
    pub fn new(provider: Box<dyn AgentProvider>) -> Self {
        Self { provider }
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    pub async fn invoke(
        &self,
        project_dir: &Path,
        stamp: &str,
        phase: Phase,
        prompt: &str,
        model: ModelClass,
        access: AccessMode,
    ) -> Result<Invocation> {
        let started = Instant::now();
        let output = self
            .provider
            .invoke(project_dir, prompt, model, access)
            .await?;
        let duration = started.elapsed();

        debug!(
            "{} {} pass finished in {}s ({} bytes)",
            self.provider.name(),
            phase,
            duration.as_secs(),
            output.len()
        );

        let log_path = logs::write_artifact(project_dir, stamp, phase, &output)?;
        Ok(Invocation {
            output,
            log_path,
            duration,
        })
    }
}
