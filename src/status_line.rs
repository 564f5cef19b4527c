//! Live status line shown while an agent invocation runs.
//!
//! Agent output is large and semi-structured, so it goes to the log
//! artifact, not the terminal; this module shows a single `\r`-overwritten
//! line with elapsed time and the current phase instead. The ticker is
//! purely observational: timing for failure detection is measured
//! separately by the orchestrator.
//!
//! In verbose mode the ticker is suppressed entirely so it cannot
//! interleave with debug logging.

use colored::Colorize;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Factory for per-phase tickers. At most one ticker is active at a time;
/// the orchestrator starts one right before an agent call and drops it
/// right after the call returns.
#[derive(Debug, Clone, Copy)]
pub struct StatusLine {
    verbose: bool,
}

impl StatusLine {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Start ticking for one phase. The returned guard stops the ticker and
    /// clears the line when dropped, on every exit path.
    pub fn start(&self, label: &'static str) -> TickerGuard {
        if self.verbose {
            return TickerGuard {
                stop: None,
                handle: None,
            };
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        draw(label, started.elapsed());
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        TickerGuard {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

/// Owns a running ticker. Dropping it signals shutdown, aborts the task,
/// and clears any partial line.
pub struct TickerGuard {
    stop: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            clear_line();
        }
    }
}

fn draw(label: &str, elapsed: Duration) {
    let secs = elapsed.as_secs();
    let line = format!(
        "  [{:02}:{:02}] {}...",
        secs / 60,
        secs % 60,
        label.cyan()
    );
    print!("\r\x1b[2K{line}");
    let _ = std::io::stdout().flush();
}

fn clear_line() {
    print!("\r\x1b[2K");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verbose_ticker_is_inert() {
        let line = StatusLine::new(true);
        let guard = line.start("planning");
        assert!(guard.handle.is_none());
        drop(guard);
    }

    #[tokio::test]
    async fn test_ticker_task_stops_on_drop() {
        let line = StatusLine::new(false);
        let guard = line.start("implementing");
        let handle = guard.handle.as_ref().map(|h| h.abort_handle());

        drop(guard);
        // The task was aborted; awaiting its abort handle is not possible,
        // but a fresh ticker can start immediately without contention.
        assert!(handle.is_some());
        let guard2 = line.start("verifying");
        drop(guard2);
    }
}
