//! Background secondary review pass.
//!
//! The reviewer is a slow, advisory collaborator: it runs concurrently with
//! the verification pass and the loop never waits for it. When the reviewer
//! tool is not installed, a placeholder artifact records that, and the
//! cycle proceeds untouched.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ReviewerConfig;
use crate::logs::{self, Phase};

/// Launch the background review for one iteration. Fire-and-forget: the
/// returned handle exists so callers can drop it explicitly, not to be
/// awaited.
pub fn start_background(
    config: ReviewerConfig,
    project_dir: &Path,
    stamp: String,
    task: String,
    developer_log: PathBuf,
) -> JoinHandle<()> {
    let dir = project_dir.to_path_buf();
    tokio::spawn(async move {
        let output = run_review(&config, &dir, &task, &developer_log).await;
        if let Err(e) = logs::write_artifact(&dir, &stamp, Phase::Reviewer, &output) {
            warn!("Failed to write reviewer artifact: {e}");
        }
    })
}

async fn run_review(
    config: &ReviewerConfig,
    project_dir: &Path,
    task: &str,
    developer_log: &Path,
) -> String {
    if !tool_available(&config.path).await {
        debug!("Reviewer '{}' not available, writing placeholder", config.path);
        return format!(
            "secondary review unavailable: '{}' is not installed\n",
            config.path
        );
    }

    let prompt = format!(
        "Perform an independent static review of the change just made for this task:\n\
         \n\
         {task}\n\
         \n\
         The implementation transcript is at {}. Review the current working \
         tree for correctness, style, and missed edge cases. Do not modify \
         any files; report findings only.\n",
        developer_log.display()
    );

    let mut args: Vec<String> = vec!["exec".to_string()];
    if let Some(ref model) = config.model {
        args.push("--model".to_string());
        args.push(model.clone());
    }

    let child = tokio::process::Command::new(&config.path)
        .current_dir(project_dir)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(c) => c,
        Err(e) => {
            // Tool vanished between the probe and the spawn; still advisory.
            return format!("secondary review unavailable: failed to start '{}': {e}\n", config.path);
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(prompt.as_bytes()).await;
        let _ = stdin.flush().await;
    }

    match child.wait_with_output().await {
        Ok(output) => {
            if !output.status.success() {
                warn!(
                    "Reviewer exited with {:?}; keeping its output anyway",
                    output.status.code()
                );
            }
            String::from_utf8_lossy(&output.stdout).to_string()
        }
        Err(e) => format!("secondary review failed: {e}\n"),
    }
}

async fn tool_available(path: &str) -> bool {
    tokio::process::Command::new(path)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
