//! Log artifacts: one timestamped, phase-tagged text file per agent
//! invocation. Artifacts are written once at invocation completion and never
//! modified afterward; external tooling may prune them by age.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::STATE_DIR;

/// Log directory relative to the project root.
pub const LOG_SUBDIR: &str = "logs";

/// The cycle phase an artifact belongs to. The name is embedded in the
/// artifact filename and is the key external analytics tools select on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planner,
    Developer,
    Reviewer,
    Tester,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Developer => "developer",
            Self::Reviewer => "reviewer",
            Self::Tester => "tester",
        }
    }

    /// Label shown on the live status line while this phase runs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Planner => "planning",
            Self::Developer => "implementing",
            Self::Reviewer => "reviewing",
            Self::Tester => "verifying",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory holding all log artifacts for a project.
pub fn log_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR).join(LOG_SUBDIR)
}

/// Path of the artifact for one (timestamp, phase) pair.
pub fn artifact_path(project_dir: &Path, stamp: &str, phase: Phase) -> PathBuf {
    log_dir(project_dir).join(format!("{stamp}_{phase}.log"))
}

/// Write a finished transcript to its artifact. The file is written in one
/// shot; readers never observe a partial artifact under a final name.
pub fn write_artifact(
    project_dir: &Path,
    stamp: &str,
    phase: Phase,
    content: &str,
) -> Result<PathBuf> {
    let dir = log_dir(project_dir);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let path = artifact_path(project_dir, stamp, phase);
    fs::write(&path, content)
        .with_context(|| format!("Failed to write log artifact: {}", path.display()))?;
    Ok(path)
}

/// Filenames of the most recent artifacts, newest first, at most `limit`.
pub fn recent_artifacts(project_dir: &Path, limit: usize) -> Vec<String> {
    let mut entries: Vec<(SystemTime, String)> = Vec::new();

    let Ok(read) = fs::read_dir(log_dir(project_dir)) else {
        return Vec::new();
    };
    for entry in read.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".log") {
            continue;
        }
        let mtime = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push((mtime, name));
    }

    entries.sort_by(|a, b| b.0.cmp(&a.0));
    entries.into_iter().take(limit).map(|(_, n)| n).collect()
}

/// Timestamp of the newest artifact write, if any. The auto-commit monitor
/// treats this as the loop's activity clock.
pub fn latest_activity(project_dir: &Path) -> Option<SystemTime> {
    let read = fs::read_dir(log_dir(project_dir)).ok()?;
    read.flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".log"))
        .filter_map(|e| e.metadata().ok().and_then(|m| m.modified().ok()))
        .max()
}

/// Session timestamp used in artifact names, e.g. `20250101_120000`.
pub fn session_stamp(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}
