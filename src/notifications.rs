//! Notifications for loop terminal events.
//!
//! Fire-and-forget: delivery failures are logged and never affect the loop
//! outcome or exit code. Targets are configured per event as
//! `"webhook:<url>"`, `"desktop"`, or `"none"`.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::process::Command;
use tracing::{debug, warn};

use crate::config::NotificationConfig;

/// Terminal loop event worth telling the operator about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// The verifier reported all work complete.
    Complete,
    /// The failure-mode heuristic terminated the loop.
    FailureMode,
}

impl LoopEvent {
    fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::FailureMode => "failure_mode",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Complete => "Cadence loop complete",
            Self::FailureMode => "Cadence loop failure mode",
        }
    }
}

/// Send the configured notification for an event, if any.
pub async fn notify(config: &NotificationConfig, event: LoopEvent, iteration: u32, message: &str) {
    let target = match event {
        LoopEvent::Complete => config.on_complete.as_deref(),
        LoopEvent::FailureMode => config.on_error.as_deref(),
    };
    let Some(target) = target else { return };

    let result = match target {
        "none" => return,
        "desktop" => desktop(event.title(), message),
        t if t.starts_with("webhook:") => {
            webhook(t.trim_start_matches("webhook:"), event, iteration, message).await
        }
        t if t.starts_with("http://") || t.starts_with("https://") => {
            webhook(t, event, iteration, message).await
        }
        other => {
            warn!("Unknown notification target '{other}', expected webhook:<url>, desktop, or none");
            return;
        }
    };

    if let Err(e) = result {
        warn!("Failed to deliver {} notification: {e}", event.as_str());
    }
}

async fn webhook(url: &str, event: LoopEvent, iteration: u32, message: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }

    let payload = json!({
        "event": event.as_str(),
        "iteration": iteration,
        "message": message,
        "timestamp": Utc::now().to_rfc3339(),
    });
    debug!("Posting {} webhook to {url}", event.as_str());

    let response = reqwest::Client::new().post(url).json(&payload).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("webhook returned status {}", response.status());
    }
    Ok(())
}

/// Desktop notification via whichever command the platform has.
fn desktop(title: &str, body: &str) -> Result<()> {
    if Command::new("notify-send").args([title, body]).output().is_ok() {
        return Ok(());
    }

    if Command::new("osascript")
        .args([
            "-e",
            &format!(
                "display notification \"{}\" with title \"{}\"",
                body.replace('"', "\\\""),
                title.replace('"', "\\\"")
            ),
        ])
        .output()
        .is_ok()
    {
        return Ok(());
    }

    anyhow::bail!("no desktop notification command available")
}
