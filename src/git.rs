//! Thin async wrappers around the `git` CLI.
//!
//! The working tree and its git metadata are the one shared mutable
//! resource: the implementing and verifying passes write to it, and the
//! auto-commit monitor commits to it independently. No locking is done
//! here; coordination is advisory and lives with the callers.

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors from the git boundary.
#[derive(Debug, Error)]
pub enum GitError {
    /// The directory is not inside a git work tree.
    #[error("not a git repository: {0}")]
    NotARepo(String),

    /// Spawning git itself failed.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// git ran but reported failure.
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

async fn git(project_dir: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = tokio::process::Command::new("git")
        .current_dir(project_dir)
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Check that `project_dir` is inside a git work tree.
pub async fn ensure_repo(project_dir: &Path) -> Result<(), GitError> {
    git(project_dir, &["rev-parse", "--is-inside-work-tree"])
        .await
        .map_err(|_| GitError::NotARepo(project_dir.display().to_string()))?;
    Ok(())
}

/// Current branch name; empty for a detached HEAD.
pub async fn current_branch(project_dir: &Path) -> Result<String, GitError> {
    let out = git(project_dir, &["branch", "--show-current"]).await?;
    Ok(out.trim().to_string())
}

/// Raw `git status --porcelain` output. Empty string means a clean tree.
pub async fn dirty_listing(project_dir: &Path) -> Result<String, GitError> {
    git(project_dir, &["status", "--porcelain"]).await
}

/// Whether the tree has uncommitted changes.
pub async fn is_dirty(project_dir: &Path) -> Result<bool, GitError> {
    Ok(!dirty_listing(project_dir).await?.trim().is_empty())
}

/// Stage everything and commit. Assumes the caller already checked the tree
/// is dirty; committing a clean tree is a `CommandFailed`.
pub async fn commit_all(project_dir: &Path, message: &str) -> Result<(), GitError> {
    debug!("Committing all changes: {message}");
    git(project_dir, &["add", "-A"]).await?;
    git(project_dir, &["commit", "-m", message]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn init_repo(dir: &Path) {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "user.name", "test"],
        ] {
            let args: Vec<&str> = args;
            git(dir, &args).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_ensure_repo_rejects_plain_dir() {
        let dir = tempdir().unwrap();
        let result = ensure_repo(dir.path()).await;
        assert!(matches!(result, Err(GitError::NotARepo(_))));
    }

    #[tokio::test]
    async fn test_clean_tree_reports_not_dirty() {
        let dir = tempdir().unwrap();
        init_repo(dir.path()).await;
        assert!(!is_dirty(dir.path()).await.unwrap());
        assert!(dirty_listing(dir.path()).await.unwrap().trim().is_empty());
    }

    #[tokio::test]
    async fn test_commit_all_clears_dirty_tree() {
        let dir = tempdir().unwrap();
        init_repo(dir.path()).await;

        std::fs::write(dir.path().join("file.txt"), "content").unwrap();
        assert!(is_dirty(dir.path()).await.unwrap());

        commit_all(dir.path(), "test commit").await.unwrap();
        assert!(!is_dirty(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_clean_tree_fails() {
        let dir = tempdir().unwrap();
        init_repo(dir.path()).await;
        std::fs::write(dir.path().join("f"), "x").unwrap();
        commit_all(dir.path(), "first").await.unwrap();

        let result = commit_all(dir.path(), "empty").await;
        assert!(matches!(result, Err(GitError::CommandFailed { .. })));
    }
}
