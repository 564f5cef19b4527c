//! The `resume` command: read the session snapshot, check for conflicts
//! with the current environment, and restart the loop.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::commands::loop_cmd;
use crate::git;
use crate::orchestrator::LoopOutcome;
use crate::snapshot::SessionSnapshot;
use crate::state::LoopState;

pub async fn run(verbose: bool, force: bool) -> Result<Option<LoopOutcome>> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let Some(snapshot) = SessionSnapshot::load(&cwd)? else {
        bail!("No paused session found. Start a new loop with 'cadence loop'.");
    };

    let mut conflicts: Vec<String> = Vec::new();

    let branch = git::current_branch(&cwd).await.unwrap_or_default();
    if branch != snapshot.branch {
        conflicts.push(format!(
            "branch changed since pause: '{}' now, '{}' at pause time",
            branch, snapshot.branch
        ));
    }
    if cwd.display().to_string() != snapshot.workdir {
        conflicts.push(format!(
            "working directory differs: '{}' now, '{}' at pause time",
            cwd.display(),
            snapshot.workdir
        ));
    }
    if let Some(state) = LoopState::load(&cwd)? {
        if state.active {
            conflicts.push("a loop already appears to be running here".to_string());
        }
    }

    if !conflicts.is_empty() {
        println!("\n{} Resume conflicts detected:", "⚠".yellow().bold());
        for conflict in &conflicts {
            println!("  - {conflict}");
        }
        if !force {
            bail!("Refusing to resume. Re-run with --force to resume anyway.");
        }
        println!("  {} resuming anyway (--force)\n", "→".yellow());
    }

    println!(
        "\n{} Resuming session paused at {}.",
        "▶".green(),
        snapshot
            .paused_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .cyan()
    );
    println!(
        "  Tasks: {} done / {} total",
        snapshot.tasks_done.to_string().cyan(),
        snapshot.tasks_total.to_string().cyan()
    );
    if let Some(ref task) = snapshot.next_task {
        println!("  Next task: {}", task.cyan());
    }
    if !snapshot.dirty_files.trim().is_empty() {
        println!(
            "  {} uncommitted changes were present at pause time",
            "⚠".yellow()
        );
    }

    // The snapshot itself is deleted by the loop once the new session
    // actually starts.
    loop_cmd::run(verbose, 0, None).await
}
