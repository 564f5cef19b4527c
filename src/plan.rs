//! Task source: reads the plan document and exposes task counts plus the
//! next open task.
//!
//! The plan is an ordered markdown checklist; the marker at the start of a
//! line encodes the status: `- [ ]` open, `- [~]` in progress, `- [x]` done.
//! Document order is the priority order. Any re-prioritization happens in
//! the planning agent pass that rewrites the document before this read.

use std::fs;
use std::path::{Path, PathBuf};

/// Status of a single plan line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskStatus {
    Open,
    InProgress,
    Done,
}

/// Aggregate counts over the plan document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: u32,
    pub done: u32,
    pub in_progress: u32,
}

impl TaskCounts {
    pub fn open(&self) -> u32 {
        self.total - self.done - self.in_progress
    }
}

/// Result of asking for the next task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTask {
    /// Literal text of the first open task, marker stripped.
    Task(String),
    /// No open or in-progress markers remain.
    AllDone,
}

/// Reads the plan document on demand. Holds only the path; the document is
/// re-read on every call because agent passes rewrite it between reads.
#[derive(Debug, Clone)]
pub struct TaskSource {
    path: PathBuf,
}

impl TaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First open task in document order, or `AllDone` when neither open nor
    /// in-progress markers remain.
    pub fn next_task(&self) -> NextTask {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return NextTask::AllDone;
        };

        let mut any_in_progress = false;
        for line in content.lines() {
            match parse_task_line(line) {
                Some((TaskStatus::Open, text)) => return NextTask::Task(text.to_string()),
                Some((TaskStatus::InProgress, _)) => any_in_progress = true,
                _ => {}
            }
        }

        if any_in_progress {
            // An interrupted task is still work; report it rather than
            // declaring the plan exhausted.
            for line in content.lines() {
                if let Some((TaskStatus::InProgress, text)) = parse_task_line(line) {
                    return NextTask::Task(text.to_string());
                }
            }
        }

        NextTask::AllDone
    }

    /// Task counts for progress reporting. A missing or malformed document
    /// yields zeros.
    pub fn counts(&self) -> TaskCounts {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return TaskCounts::default();
        };

        let mut counts = TaskCounts::default();
        for line in content.lines() {
            if let Some((status, _)) = parse_task_line(line) {
                counts.total += 1;
                match status {
                    TaskStatus::Done => counts.done += 1,
                    TaskStatus::InProgress => counts.in_progress += 1,
                    TaskStatus::Open => {}
                }
            }
        }
        counts
    }
}

/// Parse one line as a task item. Leading whitespace is tolerated; nested
/// structure is not interpreted.
fn parse_task_line(line: &str) -> Option<(TaskStatus, &str)> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("- [")?;
    let (marker, after) = rest.split_at_checked(1)?;
    let text = after.strip_prefix("] ").or_else(|| after.strip_prefix(']'))?;

    let status = match marker {
        " " => TaskStatus::Open,
        "~" => TaskStatus::InProgress,
        "x" | "X" => TaskStatus::Done,
        _ => return None,
    };
    Some((status, text.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn plan_with(content: &str) -> (NamedTempFile, TaskSource) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let source = TaskSource::new(file.path());
        (file, source)
    }

    #[test]
    fn test_counts_mixed_statuses() {
        let (_f, source) = plan_with(
            "# Plan\n\
             - [x] set up project\n\
             - [x] write parser\n\
             - [~] wire up CLI\n\
             - [ ] add tests\n\
             - [ ] write docs\n",
        );
        let counts = source.counts();
        assert_eq!(counts.total, 5);
        assert_eq!(counts.done, 2);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.open(), 2);
    }

    #[test]
    fn test_next_task_first_open_wins() {
        let (_f, source) = plan_with(
            "- [x] done already\n\
             - [ ] first open task\n\
             - [ ] second open task\n",
        );
        assert_eq!(
            source.next_task(),
            NextTask::Task("first open task".to_string())
        );
    }

    #[test]
    fn test_next_task_falls_back_to_in_progress() {
        let (_f, source) = plan_with(
            "- [x] done\n\
             - [~] half finished\n",
        );
        assert_eq!(
            source.next_task(),
            NextTask::Task("half finished".to_string())
        );
    }

    #[test]
    fn test_all_done_when_only_done_markers() {
        let (_f, source) = plan_with("- [x] a\n- [X] b\n");
        assert_eq!(source.next_task(), NextTask::AllDone);
    }

    #[test]
    fn test_missing_document_returns_zeros() {
        let source = TaskSource::new("/nonexistent/PLAN.md");
        assert_eq!(source.counts(), TaskCounts::default());
        assert_eq!(source.next_task(), NextTask::AllDone);
    }

    #[test]
    fn test_non_task_lines_ignored() {
        let (_f, source) = plan_with(
            "# Heading\n\
             Some prose about the plan.\n\
             - a plain bullet\n\
             - [?] unknown marker\n\
             - [ ] real task\n",
        );
        let counts = source.counts();
        assert_eq!(counts.total, 1);
        assert_eq!(source.next_task(), NextTask::Task("real task".to_string()));
    }

    #[test]
    fn test_indented_task_lines_counted() {
        let (_f, source) = plan_with("  - [ ] indented task\n");
        assert_eq!(source.counts().total, 1);
        assert_eq!(
            source.next_task(),
            NextTask::Task("indented task".to_string())
        );
    }
}
