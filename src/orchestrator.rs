//! The supervising state machine.
//!
//! One iteration runs Planning, then Implementing, then forks a background
//! review while Verifying runs to completion. The loop re-enters Planning
//! until the verifier emits the completion marker, the plan is exhausted,
//! the failure-mode heuristic fires, or an operator pauses or interrupts
//! the session.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::agent::{AccessMode, AgentInvoker, Invocation, ModelClass};
use crate::autocommit::{AutoCommitConfig, MonitorGuard};
use crate::config::Config;
use crate::detection::{Assessment, FailureDetector};
use crate::logs::{self, Phase};
use crate::plan::{NextTask, TaskSource};
use crate::review;
use crate::snapshot::SessionSnapshot;
use crate::state::{self, LoopState};
use crate::status_line::StatusLine;

/// Authoritative termination marker. When the verifier's transcript
/// contains it, the loop exits 0 immediately, regardless of task counts.
pub const ALL_DONE_MARKER: &str = "ALL WORK VERIFIED COMPLETE";

/// Marker classifying a single task as verified and committed.
pub const TASK_DONE_MARKER: &str = "TASK VERIFIED COMPLETE";

/// Prefix added to planning and implementing prompts on deep iterations.
const DEEP_PREAMBLE: &str = "Before doing anything else, step back and reconsider the overall \
architecture of this project. Question recent decisions, look for accumulating shortcuts or \
structural drift, and correct course if needed. Then proceed with the instructions below.\n\n";

/// Verdict parsed from the verifier transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All work verified complete; terminate the loop now.
    AllTasksDone,
    /// The current task is done and committed.
    CompleteAndCommitted,
    /// More work remains on the current task.
    Incomplete,
}

impl Verdict {
    pub fn from_output(output: &str) -> Self {
        if output.contains(ALL_DONE_MARKER) {
            Self::AllTasksDone
        } else if output.contains(TASK_DONE_MARKER) {
            Self::CompleteAndCommitted
        } else {
            Self::Incomplete
        }
    }
}

/// How a loop session ended. Only `FailureMode` maps to a non-zero exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Completion marker observed, or the plan is exhausted.
    Complete,
    /// Three consecutive fast iterations; upstream looks degraded.
    FailureMode,
    /// An operator pause request was honored.
    Paused,
    /// The configured iteration cap was reached.
    MaxIterations,
}

/// Options carried in from the CLI.
#[derive(Debug, Clone, Default)]
pub struct LoopOptions {
    pub verbose: bool,
    pub max_iterations: Option<u32>,
}

/// Whether iteration `n` (1-indexed) runs with the deep model class.
pub fn is_deep_iteration(iteration: u32, deep_interval: u32) -> bool {
    deep_interval > 0 && iteration % deep_interval == 0
}

pub(crate) struct Orchestrator {
    project_dir: PathBuf,
    config: Config,
    invoker: AgentInvoker,
    tasks: TaskSource,
    detector: FailureDetector,
    status: StatusLine,
    state: LoopState,
    max_iterations: Option<u32>,
}

impl Orchestrator {
    pub fn new(
        project_dir: &Path,
        config: Config,
        invoker: AgentInvoker,
        options: LoopOptions,
    ) -> Self {
        let tasks = TaskSource::new(project_dir.join(&config.loop_cfg.plan_file));
        let detector = FailureDetector::new(
            Duration::from_secs(config.loop_cfg.fast_floor_secs),
            Duration::from_secs(config.loop_cfg.backoff_step_secs),
            config.loop_cfg.max_consecutive_fast,
        );

        Self {
            project_dir: project_dir.to_path_buf(),
            tasks,
            detector,
            status: StatusLine::new(options.verbose),
            state: LoopState::default(),
            max_iterations: options.max_iterations,
            config,
            invoker,
        }
    }

    /// Run the loop to a terminal state. Background observers (status
    /// ticker, auto-commit monitor) are guard-owned, so cleanup happens on
    /// every exit path, including this future being dropped on Ctrl-C.
    pub async fn run(mut self) -> Result<LoopOutcome> {
        if !self.tasks.path().exists() {
            bail!(
                "Plan document not found: {}\nRun 'cadence init' to create one.",
                self.tasks.path().display()
            );
        }
        if !self.invoker.is_available().await {
            bail!(
                "Agent '{}' is not available. Install it or set [agent].path in cadence.toml.",
                self.invoker.name()
            );
        }

        // A fresh session invalidates any paused one.
        SessionSnapshot::delete(&self.project_dir)?;
        // Stale requests from a previous session must not stop this one.
        state::take_pause_request(&self.project_dir);

        let _monitor = self.maybe_spawn_monitor()?;

        self.state.active = true;
        self.state.save(&self.project_dir)?;

        let outcome = loop {
            if state::take_pause_request(&self.project_dir) {
                println!("\n{} Pause requested; stopping at iteration boundary.", "⏸".yellow());
                break LoopOutcome::Paused;
            }

            if let Some(max) = self.max_iterations {
                if self.state.iteration > max {
                    println!("\n{} Max iterations ({max}) reached.", "🛑".red());
                    break LoopOutcome::MaxIterations;
                }
            }

            if self.tasks.next_task() == NextTask::AllDone {
                println!("\n{} Plan exhausted: no open or in-progress tasks remain.", "✅".green());
                break LoopOutcome::Complete;
            }

            match self.iteration().await? {
                Some(outcome) => break outcome,
                None => {
                    self.state.iteration += 1;
                    self.state.last_iteration_at = Some(chrono::Utc::now());
                    self.state.consecutive_fast = self.detector.consecutive_fast();
                    self.state.save(&self.project_dir)?;
                }
            }
        };

        self.state.active = false;
        self.state.consecutive_fast = self.detector.consecutive_fast();
        self.state.save(&self.project_dir)?;
        Ok(outcome)
    }

    /// One full cycle. Returns a terminal outcome, or `None` to loop again.
    async fn iteration(&mut self) -> Result<Option<LoopOutcome>> {
        let iteration = self.state.iteration;
        let deep = is_deep_iteration(iteration, self.config.loop_cfg.deep_interval);
        let model = if deep { ModelClass::Deep } else { ModelClass::Primary };

        println!(
            "\n{} Iteration {}{} {}",
            "━".repeat(20).dimmed(),
            iteration.to_string().cyan().bold(),
            if deep { " (deep planning)".yellow().to_string() } else { String::new() },
            "━".repeat(20).dimmed()
        );

        let started = Instant::now();
        let stamp = logs::session_stamp(chrono::Utc::now());

        // Planning: re-prioritize the plan and mark the next task. Read-only
        // access; the document rewrite is the implementer's job if planning
        // is denied writes by the agent itself.
        let planning = self
            .invoke(&stamp, Phase::Planner, &self.planning_prompt(deep), model, AccessMode::ReadOnly)
            .await?;
        info!("Planning pass took {}s", planning.duration.as_secs());

        // The first open task after the planning pass is the planner's
        // selection; its text is carried verbatim to the implementer.
        let task = match self.tasks.next_task() {
            NextTask::Task(text) => text,
            NextTask::AllDone => {
                println!("\n{} Plan exhausted after planning pass.", "✅".green());
                return Ok(Some(LoopOutcome::Complete));
            }
        };
        println!("  {} {}", "task:".dimmed(), task);

        // Implementing: full write access, same model class as planning.
        let developer = self
            .invoke(&stamp, Phase::Developer, &self.implement_prompt(&task, deep), model, AccessMode::WriteEnabled)
            .await?;
        info!("Implementation pass took {}s", developer.duration.as_secs());

        // Fork the advisory review; never awaited.
        if self.config.reviewer.enabled {
            let handle = review::start_background(
                self.config.reviewer.clone(),
                &self.project_dir,
                stamp.clone(),
                task.clone(),
                developer.log_path.clone(),
            );
            drop(handle);
        }

        // Verifying: decides whether to commit, and owns the termination
        // marker. Always the primary model class.
        let verification = self
            .invoke(
                &stamp,
                Phase::Tester,
                &self.verify_prompt(&task, &developer.log_path),
                ModelClass::Primary,
                AccessMode::WriteEnabled,
            )
            .await?;

        match Verdict::from_output(&verification.output) {
            Verdict::AllTasksDone => {
                println!("\n{} Verifier reports all work complete.", "✅".green());
                return Ok(Some(LoopOutcome::Complete));
            }
            Verdict::CompleteAndCommitted => {
                println!("  {} task verified complete", "✓".green());
            }
            Verdict::Incomplete => {
                println!("  {} task not finished; will continue next iteration", "…".dimmed());
            }
        }

        // Iteration timing is measured here, independent of the ticker.
        let elapsed = started.elapsed();
        match self.detector.record(elapsed) {
            Assessment::Normal => {}
            Assessment::Backoff(delay) => {
                warn!(
                    "Iteration {iteration} finished in {}s, below the {}s floor",
                    elapsed.as_secs(),
                    self.config.loop_cfg.fast_floor_secs
                );
                println!(
                    "  {} suspiciously fast iteration; backing off {}s",
                    "⚠".yellow(),
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            Assessment::FailureMode => {
                eprintln!(
                    "\n{} {} consecutive iterations finished under {}s.\n\
                     The upstream agent service looks degraded (throttled or erroring).\n\
                     Inspect the recent logs under {} and check service limits before restarting.",
                    "✗".red().bold(),
                    self.config.loop_cfg.max_consecutive_fast,
                    self.config.loop_cfg.fast_floor_secs,
                    logs::log_dir(&self.project_dir).display()
                );
                return Ok(Some(LoopOutcome::FailureMode));
            }
        }

        Ok(None)
    }

    async fn invoke(
        &self,
        stamp: &str,
        phase: Phase,
        prompt: &str,
        model: ModelClass,
        access: AccessMode,
    ) -> Result<Invocation> {
        // One ticker per agent call; the guard clears the line on return
        // and on abnormal exit alike.
        let _ticker = self.status.start(phase.label());
        self.invoker
            .invoke(&self.project_dir, stamp, phase, prompt, model, access)
            .await
    }

    fn maybe_spawn_monitor(&self) -> Result<Option<MonitorGuard>> {
        let config = AutoCommitConfig::load(&self.project_dir)?;
        if config.enabled {
            info!("Starting in-process auto-commit monitor ({}s timeout)", config.timeout_secs);
            Ok(Some(MonitorGuard::spawn(&self.project_dir)))
        } else {
            Ok(None)
        }
    }

    fn planning_prompt(&self, deep: bool) -> String {
        let plan = &self.config.loop_cfg.plan_file;
        let base = format!(
            "You are the planning pass of an automated development loop.\n\
             Read {plan} and the current state of the repository. Reorder the \
             open tasks in {plan} by importance if needed (do not change their \
             text), so that the most important open task is first. Summarize \
             what the next task requires. Do not implement anything.\n"
        );
        if deep {
            format!("{DEEP_PREAMBLE}{base}")
        } else {
            base
        }
    }

    fn implement_prompt(&self, task: &str, deep: bool) -> String {
        let plan = &self.config.loop_cfg.plan_file;
        let base = format!(
            "You are the implementation pass of an automated development loop.\n\
             Implement exactly this task from {plan}:\n\
             \n\
             {task}\n\
             \n\
             Mark it as in progress (`- [~]`) in {plan} while you work. Write \
             tests alongside the change. Stay within the scope of this task.\n"
        );
        if deep {
            format!("{DEEP_PREAMBLE}{base}")
        } else {
            base
        }
    }

    fn verify_prompt(&self, task: &str, developer_log: &Path) -> String {
        let plan = &self.config.loop_cfg.plan_file;
        format!(
            "You are the verification pass of an automated development loop.\n\
             The task under review is:\n\
             \n\
             {task}\n\
             \n\
             The implementation transcript is at {}. Build the project and run \
             the tests. If the task is genuinely done: mark it `- [x]` in \
             {plan}, commit all related changes with a descriptive message, \
             and print the line '{TASK_DONE_MARKER}'. If it is not done, \
             describe what is missing and do not commit. Only if every task \
             in {plan} is done and the whole project verifies cleanly, print \
             the line '{ALL_DONE_MARKER}'.\n",
            developer_log.display()
        )
    }
}
