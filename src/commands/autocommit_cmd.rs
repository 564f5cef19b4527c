//! The `autocommit` command group: control surface for the watchdog.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use tokio::sync::watch;

use crate::autocommit::{self, AutoCommitConfig};
use crate::git;

#[derive(Debug, Clone, Subcommand)]
pub enum AutocommitAction {
    /// Enable the auto-commit watchdog
    Enable {
        /// Inactivity timeout in seconds before a commit
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Disable the auto-commit watchdog
    Disable,

    /// Show watchdog configuration
    Status,

    /// Commit outstanding changes right now
    Commit,

    /// Run the watchdog in the foreground until interrupted
    Monitor,
}

pub async fn run(action: AutocommitAction) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    match action {
        AutocommitAction::Enable { timeout } => {
            let mut config = AutoCommitConfig::load(&cwd)?;
            config.enabled = true;
            if let Some(timeout) = timeout {
                config.timeout_secs = timeout;
            }
            config.save(&cwd)?;
            println!(
                "\n{} Auto-commit enabled ({}s inactivity timeout).",
                "✓".green(),
                config.timeout_secs.to_string().cyan()
            );
        }

        AutocommitAction::Disable => {
            let mut config = AutoCommitConfig::load(&cwd)?;
            config.enabled = false;
            config.save(&cwd)?;
            println!("\n{} Auto-commit disabled.", "✓".green());
        }

        AutocommitAction::Status => {
            let config = AutoCommitConfig::load(&cwd)?;
            let status = if config.enabled {
                "enabled".green().bold()
            } else {
                "disabled".red()
            };
            println!("\n  Auto-commit: {status}");
            println!("  Timeout:     {}s", config.timeout_secs.to_string().cyan());
            match config.last_commit_at {
                Some(at) => println!(
                    "  Last commit: {}",
                    at.format("%Y-%m-%d %H:%M:%S UTC").to_string().cyan()
                ),
                None => println!("  Last commit: {}", "never".dimmed()),
            }
        }

        AutocommitAction::Commit => {
            git::ensure_repo(&cwd).await?;
            if !git::is_dirty(&cwd).await? {
                println!("\n{} Working tree is clean; nothing to commit.", "ℹ".blue());
                return Ok(());
            }

            git::commit_all(&cwd, "cadence: manual checkpoint commit").await?;
            let mut config = AutoCommitConfig::load(&cwd)?;
            config.last_commit_at = Some(Utc::now());
            config.save(&cwd)?;
            println!("\n{} Committed outstanding changes.", "✓".green());
        }

        AutocommitAction::Monitor => {
            git::ensure_repo(&cwd).await?;
            if !autocommit::acquire_pid_file(&cwd).await? {
                bail!("An auto-commit monitor is already running in this directory.");
            }

            let config = AutoCommitConfig::load(&cwd)?;
            println!(
                "\n{} Auto-commit monitor running ({}s timeout, {}). Ctrl+C to stop.",
                "👁".cyan(),
                config.timeout_secs,
                if config.enabled {
                    "enabled".green()
                } else {
                    "currently disabled".yellow()
                }
            );

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::select! {
                () = autocommit::run_monitor(cwd.clone(), shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    let _ = shutdown_tx.send(true);
                    println!("\n{} Monitor stopped.", "✓".green());
                }
            }
            autocommit::release_pid_file(&cwd);
        }
    }

    Ok(())
}
