use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod agent;
mod autocommit;
mod commands;
mod config;
mod detection;
mod git;
mod logs;
mod notifications;
mod orchestrator;
mod plan;
mod review;
mod snapshot;
mod state;
mod status_line;

use orchestrator::LoopOutcome;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(
    author,
    version,
    about = "Supervised iterative AI development loops with failure detection and pause/resume"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (suppresses the live status line)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Cadence files in the current project
    Init {
        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Start a supervised development loop
    Loop {
        /// Maximum number of iterations (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max_iterations: u32,

        /// Plan document (overrides cadence.toml)
        #[arg(short, long)]
        plan: Option<String>,
    },

    /// Pause a running loop and write a session snapshot
    Pause,

    /// Resume a paused session
    Resume {
        /// Resume even when branch/directory conflicts are detected
        #[arg(short, long)]
        force: bool,
    },

    /// Show loop, plan, and auto-commit status
    Status,

    /// Control the auto-commit watchdog
    Autocommit {
        #[command(subcommand)]
        action: commands::autocommit_cmd::AutocommitAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("cadence=debug")
    } else {
        EnvFilter::new("cadence=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force).await?;
        }
        Commands::Loop {
            max_iterations,
            plan,
        } => {
            let outcome = commands::loop_cmd::run(cli.verbose, max_iterations, plan).await?;
            exit_for(outcome);
        }
        Commands::Pause => {
            commands::pause::run().await?;
        }
        Commands::Resume { force } => {
            let outcome = commands::resume::run(cli.verbose, force).await?;
            exit_for(outcome);
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Autocommit { action } => {
            commands::autocommit_cmd::run(action).await?;
        }
    }

    Ok(())
}

/// Failure mode is the one loop outcome that exits non-zero; everything
/// else (complete, paused, capped, interrupted) is a normal exit.
fn exit_for(outcome: Option<LoopOutcome>) {
    if outcome == Some(LoopOutcome::FailureMode) {
        std::process::exit(1);
    }
}
