//! The `status` command: read-only view of the loop, plan, and watchdog.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::autocommit::AutoCommitConfig;
use crate::config::Config;
use crate::plan::TaskSource;
use crate::snapshot::SessionSnapshot;
use crate::state::LoopState;

pub async fn run() -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&cwd)?;

    println!("\n{}", "━".repeat(50).dimmed());
    println!("{}", "   🔄 Cadence Status".yellow().bold());
    println!("{}", "━".repeat(50).dimmed());

    match LoopState::load(&cwd)? {
        Some(state) => {
            let status = if state.active {
                "active".green().bold()
            } else {
                "inactive".red()
            };
            println!("  Loop:        {status}");
            println!("  Iteration:   {}", state.iteration.to_string().cyan());
            println!(
                "  Started:     {}",
                state
                    .started_at
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
                    .cyan()
            );
            if let Some(last) = state.last_iteration_at {
                println!(
                    "  Last iter:   {}",
                    last.format("%Y-%m-%d %H:%M:%S UTC").to_string().cyan()
                );
            }
            if state.consecutive_fast > 0 {
                println!(
                    "  Fast streak: {}",
                    state.consecutive_fast.to_string().yellow()
                );
            }
        }
        None => {
            println!("  Loop:        {}", "never run".dimmed());
        }
    }

    let counts = TaskSource::new(cwd.join(&config.loop_cfg.plan_file)).counts();
    println!(
        "  Tasks:       {} done, {} in progress, {} open ({} total)",
        counts.done.to_string().green(),
        counts.in_progress.to_string().yellow(),
        counts.open().to_string().cyan(),
        counts.total
    );

    if let Some(snapshot) = SessionSnapshot::load(&cwd)? {
        println!(
            "  Paused:      {} (resume with 'cadence resume')",
            snapshot
                .paused_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
                .yellow()
        );
    }

    let autocommit = AutoCommitConfig::load(&cwd)?;
    let ac_status = if autocommit.enabled {
        format!("enabled ({}s timeout)", autocommit.timeout_secs).green()
    } else {
        "disabled".red()
    };
    println!("  Auto-commit: {ac_status}");

    println!("{}", "━".repeat(50).dimmed());
    Ok(())
}
