//! Live loop state and the pause-request marker.
//!
//! The state file records where a running (or last) loop session stands;
//! it is written by the loop at iteration boundaries and read by the
//! `status`, `pause`, and `resume` commands. The pause-request marker is
//! how `pause` asks a running loop to stop at its next iteration boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::STATE_DIR;

const STATE_FILE: &str = "state.toml";
const PAUSE_FILE: &str = "pause-requested";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopState {
    pub active: bool,
    pub iteration: u32,
    pub started_at: DateTime<Utc>,
    pub last_iteration_at: Option<DateTime<Utc>>,
    /// Current consecutive-fast streak, mirrored from the failure detector.
    pub consecutive_fast: u32,
}

impl Default for LoopState {
    fn default() -> Self {
        Self {
            active: false,
            iteration: 1,
            started_at: Utc::now(),
            last_iteration_at: None,
            consecutive_fast: 0,
        }
    }
}

impl LoopState {
    fn path(project_dir: &Path) -> std::path::PathBuf {
        project_dir.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load state from file if it exists
    pub fn load(project_dir: &Path) -> Result<Option<Self>> {
        let state_path = Self::path(project_dir);

        if !state_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&state_path)
            .with_context(|| format!("Failed to read state file: {}", state_path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", state_path.display()))?;

        Ok(Some(state))
    }

    /// Save state to file
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let state_path = Self::path(project_dir);

        if let Some(parent) = state_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize state")?;

        fs::write(&state_path, content)
            .with_context(|| format!("Failed to write state file: {}", state_path.display()))?;

        Ok(())
    }
}

/// Ask a running loop to stop at its next iteration boundary.
pub fn request_pause(project_dir: &Path) -> Result<()> {
    let path = project_dir.join(STATE_DIR).join(PAUSE_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, Utc::now().to_rfc3339())
        .with_context(|| format!("Failed to write pause request: {}", path.display()))?;
    Ok(())
}

/// Consume a pending pause request, if any.
pub fn take_pause_request(project_dir: &Path) -> bool {
    let path = project_dir.join(STATE_DIR).join(PAUSE_FILE);
    if path.exists() {
        let _ = fs::remove_file(&path);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_state_roundtrip() {
        let dir = tempdir().unwrap();
        let state = LoopState {
            active: true,
            iteration: 5,
            started_at: Utc::now(),
            last_iteration_at: Some(Utc::now()),
            consecutive_fast: 2,
        };

        state.save(dir.path()).unwrap();
        let loaded = LoopState::load(dir.path()).unwrap().unwrap();

        assert_eq!(loaded.active, state.active);
        assert_eq!(loaded.iteration, state.iteration);
        assert_eq!(loaded.consecutive_fast, state.consecutive_fast);
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempdir().unwrap();
        assert!(LoopState::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_pause_request_is_consumed_once() {
        let dir = tempdir().unwrap();
        assert!(!take_pause_request(dir.path()));

        request_pause(dir.path()).unwrap();
        assert!(take_pause_request(dir.path()));
        assert!(!take_pause_request(dir.path()));
    }
}
