//! Auto-commit watchdog.
//!
//! A best-effort safety net, independent of the main loop: when the working
//! tree stays dirty through a sustained period of inactivity, the watchdog
//! commits outstanding changes so agent work cannot be silently lost. The
//! main loop's own verification pass is expected to commit promptly and so
//! naturally pre-empts the watchdog.
//!
//! The config file is the shared record between the CLI control surface and
//! the monitor; both tolerate eventual consistency. A pid file gives a
//! best-effort guard against two standalone monitors in one project, not a
//! true lock.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::STATE_DIR;
use crate::{git, logs};

const AUTOCOMMIT_FILE: &str = "autocommit.toml";
const PID_FILE: &str = "autocommit.pid";

/// How often the monitor re-checks the tree and config.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Watchdog configuration and its one piece of mutable state. All three
/// fields are present after every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCommitConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub last_commit_at: Option<DateTime<Utc>>,
}

impl Default for AutoCommitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 600,
            last_commit_at: None,
        }
    }
}

impl AutoCommitConfig {
    fn path(project_dir: &Path) -> std::path::PathBuf {
        project_dir.join(STATE_DIR).join(AUTOCOMMIT_FILE)
    }

    /// Load the config, defaulting on first use.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::path(project_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read auto-commit config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse auto-commit config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let path = Self::path(project_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content =
            toml::to_string_pretty(self).context("Failed to serialize auto-commit config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write auto-commit config: {}", path.display()))?;
        Ok(())
    }
}

/// Decide whether to commit now. Pure so the timeout arithmetic is
/// testable without a repository.
///
/// The activity clock is whichever is newer: the last log-artifact write or
/// the last auto-commit. A clean tree never commits.
fn should_commit(
    now: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    last_commit: Option<DateTime<Utc>>,
    timeout: ChronoDuration,
    tree_dirty: bool,
) -> bool {
    if !tree_dirty {
        return false;
    }
    let reference = match last_commit {
        Some(commit) => last_activity.max(commit),
        None => last_activity,
    };
    now - reference >= timeout
}

/// One monitor pass: re-read config, evaluate, possibly commit.
async fn tick(project_dir: &Path, monitor_started: DateTime<Utc>) -> Result<()> {
    let config = AutoCommitConfig::load(project_dir)?;
    if !config.enabled {
        return Ok(());
    }

    let dirty = match git::is_dirty(project_dir).await {
        Ok(d) => d,
        Err(e) => {
            warn!("Auto-commit skipped, git status failed: {e}");
            return Ok(());
        }
    };

    let last_activity = logs::latest_activity(project_dir)
        .map(DateTime::<Utc>::from)
        .unwrap_or(monitor_started);

    let timeout = ChronoDuration::seconds(config.timeout_secs as i64);
    if !should_commit(Utc::now(), last_activity, config.last_commit_at, timeout, dirty) {
        debug!("Auto-commit: nothing to do");
        return Ok(());
    }

    let message = format!(
        "cadence: auto-commit after {}s of inactivity",
        config.timeout_secs
    );
    match git::commit_all(project_dir, &message).await {
        Ok(()) => {
            info!("Auto-commit: committed outstanding changes");
            let mut updated = config;
            updated.last_commit_at = Some(Utc::now());
            updated.save(project_dir)?;
        }
        Err(e) => warn!("Auto-commit failed: {e}"),
    }
    Ok(())
}

/// Monitor loop body, shared by the in-process guard and the standalone
/// `autocommit monitor` command. Runs until the shutdown signal fires.
pub async fn run_monitor(project_dir: std::path::PathBuf, mut shutdown: watch::Receiver<bool>) {
    let monitor_started = Utc::now();
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tick(&project_dir, monitor_started).await {
                    warn!("Auto-commit monitor tick failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                debug!("Auto-commit monitor shutting down");
                break;
            }
        }
    }
}

/// Owns an in-process monitor task; dropping the guard stops it. A monitor
/// started by a different process is unaffected and is controlled through
/// `autocommit disable` instead.
pub struct MonitorGuard {
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl MonitorGuard {
    pub fn spawn(project_dir: &Path) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dir = project_dir.to_path_buf();
        let handle = tokio::spawn(run_monitor(dir, shutdown_rx));
        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Record this process as the standalone monitor. Returns false when
/// another live monitor already holds the pid file.
pub async fn acquire_pid_file(project_dir: &Path) -> Result<bool> {
    let path = project_dir.join(STATE_DIR).join(PID_FILE);

    if let Ok(content) = fs::read_to_string(&path) {
        if let Ok(pid) = content.trim().parse::<u32>() {
            if process_alive(pid).await {
                return Ok(false);
            }
            debug!("Stale monitor pid file for pid {pid}, taking over");
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, std::process::id().to_string())
        .with_context(|| format!("Failed to write pid file: {}", path.display()))?;
    Ok(true)
}

/// Remove the pid file on monitor shutdown.
pub fn release_pid_file(project_dir: &Path) {
    let _ = fs::remove_file(project_dir.join(STATE_DIR).join(PID_FILE));
}

/// Best-effort process-presence check via `kill -0`.
async fn process_alive(pid: u32) -> bool {
    tokio::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_config_roundtrip_all_fields_present() {
        let dir = tempdir().unwrap();
        let config = AutoCommitConfig {
            enabled: true,
            timeout_secs: 120,
            last_commit_at: Some(at(0)),
        };

        config.save(dir.path()).unwrap();

        let on_disk = fs::read_to_string(dir.path().join(".cadence/autocommit.toml")).unwrap();
        assert!(on_disk.contains("enabled"));
        assert!(on_disk.contains("timeout_secs"));
        assert!(on_disk.contains("last_commit_at"));

        let loaded = AutoCommitConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_defaults_on_first_use() {
        let dir = tempdir().unwrap();
        let config = AutoCommitConfig::load(dir.path()).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.timeout_secs, 600);
        assert!(config.last_commit_at.is_none());
    }

    #[test]
    fn test_never_commits_clean_tree() {
        let timeout = ChronoDuration::seconds(60);
        // Inactivity far beyond the timeout, but the tree is clean.
        assert!(!should_commit(at(10_000), at(0), None, timeout, false));
    }

    #[test]
    fn test_commits_dirty_tree_after_timeout() {
        let timeout = ChronoDuration::seconds(60);
        assert!(should_commit(at(61), at(0), None, timeout, true));
        assert!(!should_commit(at(59), at(0), None, timeout, true));
    }

    #[test]
    fn test_log_write_resets_activity_clock() {
        let timeout = ChronoDuration::seconds(60);
        // Last activity refreshed at t=50: not yet inactive at t=100.
        assert!(!should_commit(at(100), at(50), None, timeout, true));
        assert!(should_commit(at(111), at(50), None, timeout, true));
    }

    #[test]
    fn test_at_most_one_commit_per_timeout_period() {
        let timeout = ChronoDuration::seconds(60);
        // Committed at t=70; even though logs are old, no second commit
        // until a full timeout after that commit.
        assert!(!should_commit(at(100), at(0), Some(at(70)), timeout, true));
        assert!(should_commit(at(131), at(0), Some(at(70)), timeout, true));
    }
}
