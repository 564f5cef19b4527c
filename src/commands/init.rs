//! The `init` command: scaffold configuration and plan files.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# Cadence configuration

[agent]
# Path to the Claude Code CLI.
path = "claude"
# Model for ordinary iterations (agent default if unset).
# primary_model = "sonnet"
# Model for deep-planning iterations.
deep_model = "opus"

[reviewer]
# Optional secondary reviewer; its absence degrades to a placeholder log.
enabled = true
path = "codex"

[loop]
plan_file = "PLAN.md"
# Iterations faster than this count toward failure detection.
fast_floor_secs = 300
backoff_step_secs = 60
max_consecutive_fast = 3
# Every Nth iteration uses the deep model class.
deep_interval = 4

[notifications]
# on_complete = "webhook:https://example.com/hook"
# on_error = "desktop"
"#;

const PLAN_TEMPLATE: &str = r#"# Plan

Tasks are worked top to bottom. Markers: `- [ ]` open, `- [~]` in progress,
`- [x]` done.

- [ ] Describe the first piece of work here
- [ ] And the next one
"#;

pub async fn run(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    println!("\n{} Initializing Cadence files...\n", "🔄".cyan());

    let mut created = 0;
    for (name, content) in [("cadence.toml", CONFIG_TEMPLATE), ("PLAN.md", PLAN_TEMPLATE)] {
        if write_file(&cwd, name, content, force)? {
            created += 1;
        }
    }

    if created > 0 {
        println!(
            "\n{} Cadence initialized successfully ({created} file(s) written).",
            "✅".green()
        );
        println!("  Edit {} and run {}.", "PLAN.md".cyan(), "cadence loop".green());
    } else {
        println!(
            "\n{} Nothing written. Use {} to overwrite existing files.",
            "ℹ".blue(),
            "--force".cyan()
        );
    }

    Ok(())
}

/// Returns whether the file was written.
fn write_file(cwd: &Path, name: &str, content: &str, force: bool) -> Result<bool> {
    let path = cwd.join(name);

    if path.exists() && !force {
        println!("  {} {name} already exists, skipping (--force to overwrite)", "•".dimmed());
        return Ok(false);
    }

    let overwritten = path.exists();
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    if overwritten {
        println!("  {} {name} overwritten", "✓".yellow());
    } else {
        println!("  {} {name} created", "✓".green());
    }
    Ok(true)
}
