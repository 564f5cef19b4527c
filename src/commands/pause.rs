//! The `pause` command: ask a running loop to stop at its next iteration
//! boundary and write the session snapshot used by `resume`.

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use std::path::Path;

use crate::config::Config;
use crate::plan::{NextTask, TaskSource};
use crate::snapshot::{SessionSnapshot, RECENT_LOG_LIMIT};
use crate::state::{self, LoopState};
use crate::{git, logs};

pub async fn run() -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let Some(loop_state) = LoopState::load(&cwd)? else {
        println!("\n{} No loop has run in this directory.", "ℹ".blue());
        return Ok(());
    };
    if !loop_state.active {
        println!("\n{} No active loop to pause.", "ℹ".blue());
        return Ok(());
    }

    state::request_pause(&cwd)?;

    let snapshot = capture(&cwd).await?;
    snapshot.save(&cwd)?;

    println!(
        "\n{} Pause requested (loop was at iteration {}).",
        "⏸".yellow(),
        loop_state.iteration.to_string().cyan()
    );
    println!("  The loop stops at its next iteration boundary.");
    println!(
        "  Snapshot written: {} done / {} total tasks, branch {}",
        snapshot.tasks_done.to_string().cyan(),
        snapshot.tasks_total.to_string().cyan(),
        snapshot.branch.cyan()
    );
    if let Some(ref task) = snapshot.next_task {
        println!("  Next task: {}", task.cyan());
    }
    println!("\n  Resume with {}.", "cadence resume".green());

    Ok(())
}

/// Gather the snapshot from the working directory's current state.
async fn capture(cwd: &Path) -> Result<SessionSnapshot> {
    let config = Config::load(cwd)?;
    let tasks = TaskSource::new(cwd.join(&config.loop_cfg.plan_file));
    let counts = tasks.counts();

    let branch = git::current_branch(cwd).await.unwrap_or_default();
    let dirty_files = git::dirty_listing(cwd).await.unwrap_or_default();

    Ok(SessionSnapshot {
        paused_at: Utc::now(),
        branch,
        workdir: cwd.display().to_string(),
        dirty_files,
        recent_logs: logs::recent_artifacts(cwd, RECENT_LOG_LIMIT),
        tasks_total: counts.total,
        tasks_done: counts.done,
        next_task: match tasks.next_task() {
            NextTask::Task(text) => Some(text),
            NextTask::AllDone => None,
        },
    })
}
