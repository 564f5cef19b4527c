//! The `loop` command: run the supervising cycle to a terminal state.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::agent::{AgentInvoker, ClaudeProvider};
use crate::config::Config;
use crate::notifications::{self, LoopEvent};
use crate::orchestrator::{LoopOptions, LoopOutcome, Orchestrator};
use crate::state::LoopState;

/// Run the loop. `None` means the session was interrupted by the operator
/// (Ctrl-C), which is a normal exit.
pub async fn run(
    verbose: bool,
    max_iterations: u32,
    plan: Option<String>,
) -> Result<Option<LoopOutcome>> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let mut config = Config::load(&cwd).context("Failed to load cadence.toml")?;
    if let Some(plan) = plan {
        config.loop_cfg.plan_file = plan;
    }

    let options = LoopOptions {
        verbose,
        max_iterations: (max_iterations > 0).then_some(max_iterations),
    };

    print_banner(&config, &options);

    let invoker = AgentInvoker::new(Box::new(ClaudeProvider::new(config.agent.clone())));
    let notify_cfg = config.notifications.clone();
    let orchestrator = Orchestrator::new(&cwd, config, invoker, options);

    // Ctrl-C drops the loop future; guard-owned observers (ticker,
    // auto-commit monitor) clean themselves up in their Drop impls.
    let outcome = tokio::select! {
        result = orchestrator.run() => Some(result?),
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} Interrupted; stopping loop.", "⏹".yellow());
            None
        }
    };

    if outcome.is_none() {
        // The loop future never got to write its final state.
        if let Some(mut state) = LoopState::load(&cwd)? {
            state.active = false;
            state.save(&cwd)?;
        }
    }

    let iteration = LoopState::load(&cwd)?.map(|s| s.iteration).unwrap_or(0);
    match outcome {
        Some(LoopOutcome::Complete) => {
            println!("\n{} Loop finished: all work verified complete.", "🎉".green());
            notifications::notify(
                &notify_cfg,
                LoopEvent::Complete,
                iteration,
                "all work verified complete",
            )
            .await;
        }
        Some(LoopOutcome::FailureMode) => {
            notifications::notify(
                &notify_cfg,
                LoopEvent::FailureMode,
                iteration,
                "consecutive fast iterations; upstream agent looks degraded",
            )
            .await;
        }
        Some(LoopOutcome::Paused) => {
            println!("\n{} Loop paused. Resume with 'cadence resume'.", "⏸".yellow());
        }
        Some(LoopOutcome::MaxIterations) | None => {}
    }

    info!("Loop session ended: {:?}", outcome);
    Ok(outcome)
}

fn print_banner(config: &Config, options: &LoopOptions) {
    println!("\n{}", "━".repeat(50).dimmed());
    println!("{}", "   🔄 Cadence Loop Starting".yellow().bold());
    println!("{}", "━".repeat(50).dimmed());

    println!("  Plan:       {}", config.loop_cfg.plan_file.cyan());
    println!(
        "  Max:        {}",
        options
            .max_iterations
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
            .cyan()
    );
    println!(
        "  Deep every: {}",
        format!("{} iterations", config.loop_cfg.deep_interval).cyan()
    );
    println!(
        "  Fast floor: {}",
        format!("{}s", config.loop_cfg.fast_floor_secs).cyan()
    );
    let reviewer = if config.reviewer.enabled {
        config.reviewer.path.as_str().green()
    } else {
        "disabled".red()
    };
    println!("  Reviewer:   {reviewer}");

    println!("{}", "━".repeat(50).dimmed());
    println!("\n  {} to stop\n", "Ctrl+C or 'cadence pause'".dimmed());
}
