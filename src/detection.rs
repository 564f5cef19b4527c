//! Failure detection for the loop.
//!
//! A throttled or erroring upstream agent does not reliably report failure
//! through its exit code; it shows up as anomalously fast iterations that
//! return near-instantly with degenerate output. The detector watches
//! iteration durations: consecutive fast iterations escalate through
//! increasing backoff delays and finally terminate the loop.

use std::time::Duration;
use tracing::debug;

/// Classifies completed iterations by duration.
///
/// An iteration under `fast_floor` increments a consecutive-fast counter;
/// any iteration at or above the floor clears it. Reaching
/// `max_consecutive` is the failure-mode signal.
#[derive(Debug)]
pub struct FailureDetector {
    /// Durations below this are considered failure-loop candidates.
    fast_floor: Duration,
    /// Backoff applied per consecutive fast iteration.
    backoff_step: Duration,
    /// Streak length at which the loop gives up.
    max_consecutive: u32,
    /// Current consecutive-fast streak.
    consecutive_fast: u32,
}

/// Outcome of recording one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Duration at or above the floor; suspicion fully cleared.
    Normal,
    /// Fast iteration; delay this long before the next one.
    Backoff(Duration),
    /// Too many consecutive fast iterations; terminate the loop.
    FailureMode,
}

impl FailureDetector {
    pub fn new(fast_floor: Duration, backoff_step: Duration, max_consecutive: u32) -> Self {
        Self {
            fast_floor,
            backoff_step,
            max_consecutive,
            consecutive_fast: 0,
        }
    }

    /// Record a completed iteration and classify it.
    pub fn record(&mut self, duration: Duration) -> Assessment {
        if duration >= self.fast_floor {
            if self.consecutive_fast > 0 {
                debug!(
                    "Normal iteration ({}s), clearing fast streak of {}",
                    duration.as_secs(),
                    self.consecutive_fast
                );
            }
            self.consecutive_fast = 0;
            return Assessment::Normal;
        }

        self.consecutive_fast += 1;
        debug!(
            "Fast iteration ({}s < {}s floor), streak {}/{}",
            duration.as_secs(),
            self.fast_floor.as_secs(),
            self.consecutive_fast,
            self.max_consecutive
        );

        if self.consecutive_fast >= self.max_consecutive {
            Assessment::FailureMode
        } else {
            Assessment::Backoff(self.backoff_step * self.consecutive_fast)
        }
    }

    /// Current streak length (for display and state persistence).
    pub fn consecutive_fast(&self) -> u32 {
        self.consecutive_fast
    }
}
