//! Session snapshot for pause/resume.
//!
//! Written when a loop is paused, read when it is resumed, and deleted when
//! a new loop session starts. The snapshot is owned by the pause/resume
//! commands; the live loop never reads it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::STATE_DIR;

const SNAPSHOT_FILE: &str = "session.toml";

/// How many recent log filenames the snapshot carries.
pub const RECENT_LOG_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// When the session was paused.
    pub paused_at: DateTime<Utc>,
    /// Branch the loop was running on.
    pub branch: String,
    /// Absolute working directory of the session.
    pub workdir: String,
    /// Raw `git status --porcelain` output at pause time.
    pub dirty_files: String,
    /// Most recent log artifact filenames, newest first.
    pub recent_logs: Vec<String>,
    /// Task counts at pause time.
    pub tasks_total: u32,
    pub tasks_done: u32,
    /// Literal text of the next open task, if any.
    pub next_task: Option<String>,
}

impl SessionSnapshot {
    fn path(project_dir: &Path) -> std::path::PathBuf {
        project_dir.join(STATE_DIR).join(SNAPSHOT_FILE)
    }

    /// Load the snapshot if one exists.
    pub fn load(project_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(project_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session snapshot: {}", path.display()))?;
        let snapshot: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse session snapshot: {}", path.display()))?;
        Ok(Some(snapshot))
    }

    /// Save the snapshot, creating the state directory if needed.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let path = Self::path(project_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize snapshot")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write session snapshot: {}", path.display()))?;
        Ok(())
    }

    /// Delete the snapshot. Returns whether one existed.
    pub fn delete(project_dir: &Path) -> Result<bool> {
        let path = Self::path(project_dir);
        if path.exists() {
            fs::remove_file(&path).with_context(|| {
                format!("Failed to delete session snapshot: {}", path.display())
            })?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> SessionSnapshot {
        SessionSnapshot {
            paused_at: "2025-01-01T12:00:00Z".parse().unwrap(),
            branch: "feature/loop".to_string(),
            workdir: "/home/dev/project".to_string(),
            dirty_files: " M src/main.rs\n?? notes.txt\n".to_string(),
            recent_logs: vec![
                "20250101_115500_tester.log".to_string(),
                "20250101_115000_developer.log".to_string(),
                "20250101_114500_planner.log".to_string(),
            ],
            tasks_total: 12,
            tasks_done: 7,
            next_task: Some("wire up the resume command".to_string()),
        }
    }

    #[test]
    fn test_snapshot_roundtrip_is_exact() {
        let dir = tempdir().unwrap();
        let snapshot = sample();

        snapshot.save(dir.path()).unwrap();
        let loaded = SessionSnapshot::load(dir.path()).unwrap().unwrap();

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_roundtrip_with_empty_fields() {
        let dir = tempdir().unwrap();
        let snapshot = SessionSnapshot {
            dirty_files: String::new(),
            recent_logs: Vec::new(),
            next_task: None,
            ..sample()
        };

        snapshot.save(dir.path()).unwrap();
        let loaded = SessionSnapshot::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempdir().unwrap();
        assert!(SessionSnapshot::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        assert!(!SessionSnapshot::delete(dir.path()).unwrap());

        sample().save(dir.path()).unwrap();
        assert!(SessionSnapshot::delete(dir.path()).unwrap());
        assert!(SessionSnapshot::load(dir.path()).unwrap().is_none());
    }
}
