// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-control boundary.
//!
//! The core never runs git itself; it asks this capability for worktree
//! lifecycle, merges, and diffs. `GitVcs` shells out to the git CLI with
//! timeouts; `FakeVcs` keeps an in-memory model for tests.

use crate::subprocess::{combined_output, run_with_timeout, GIT_TIMEOUT};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git {action} failed: {detail}")]
    CommandFailed { action: String, detail: String },
}

fn command_failed(action: &str, detail: impl Into<String>) -> VcsError {
    VcsError::CommandFailed {
        action: action.to_string(),
        detail: detail.into(),
    }
}

/// One registered worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
}

/// Changed-file list and line counts for a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files: Vec<String>,
    pub additions: u64,
    pub deletions: u64,
}

/// A diff against a base branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub text: String,
    pub stats: DiffStats,
}

/// Outcome of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    /// The merge was aborted; the detail is git's conflict report.
    Conflict(String),
}

/// Version-control operations the daemon depends on.
#[async_trait::async_trait]
pub trait Vcs: Send + Sync {
    /// Create `branch` off `base` and check it out at `path`.
    async fn create_worktree(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), VcsError>;

    async fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<(), VcsError>;

    async fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeInfo>, VcsError>;

    /// Drop stale entries from the worktree registry.
    async fn prune_worktrees(&self, repo: &Path) -> Result<(), VcsError>;

    async fn delete_branch(&self, repo: &Path, branch: &str) -> Result<(), VcsError>;

    /// Merge `branch` into `target` with a no-fast-forward commit.
    /// Conflicts abort the merge and report [`MergeOutcome::Conflict`].
    async fn merge_branch(
        &self,
        repo: &Path,
        branch: &str,
        target: &str,
        message: &str,
    ) -> Result<MergeOutcome, VcsError>;

    /// Diff a worktree's HEAD against the merge base with `base`.
    async fn diff_against(&self, worktree: &Path, base: &str) -> Result<Diff, VcsError>;

    /// Whether merging `branch` into `target` would conflict.
    async fn has_conflicts(
        &self,
        repo: &Path,
        branch: &str,
        target: &str,
    ) -> Result<bool, VcsError>;
}

/// Git CLI implementation.
#[derive(Debug, Clone, Default)]
pub struct GitVcs;

impl GitVcs {
    async fn git(&self, dir: &Path, action: &str, args: &[&str]) -> Result<String, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir).args(args);
        debug!(dir = %dir.display(), ?args, "running git");
        let output = run_with_timeout(cmd, GIT_TIMEOUT, action)
            .await
            .map_err(|e| command_failed(action, e))?;
        if !output.status.success() {
            return Err(command_failed(action, combined_output(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait::async_trait]
impl Vcs for GitVcs {
    async fn create_worktree(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), VcsError> {
        let path_str = path.display().to_string();
        self.git(
            repo,
            "worktree add",
            &["worktree", "add", "-b", branch, &path_str, base],
        )
        .await?;
        Ok(())
    }

    async fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<(), VcsError> {
        let path_str = path.display().to_string();
        self.git(
            repo,
            "worktree remove",
            &["worktree", "remove", "--force", &path_str],
        )
        .await?;
        Ok(())
    }

    async fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeInfo>, VcsError> {
        let output = self
            .git(repo, "worktree list", &["worktree", "list", "--porcelain"])
            .await?;

        let mut worktrees = Vec::new();
        let mut current: Option<WorktreeInfo> = None;
        for line in output.lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                if let Some(info) = current.take() {
                    worktrees.push(info);
                }
                current = Some(WorktreeInfo {
                    path: PathBuf::from(path),
                    branch: None,
                });
            } else if let Some(branch) = line.strip_prefix("branch ") {
                if let Some(info) = current.as_mut() {
                    info.branch = Some(
                        branch
                            .strip_prefix("refs/heads/")
                            .unwrap_or(branch)
                            .to_string(),
                    );
                }
            }
        }
        if let Some(info) = current.take() {
            worktrees.push(info);
        }
        Ok(worktrees)
    }

    async fn prune_worktrees(&self, repo: &Path) -> Result<(), VcsError> {
        self.git(repo, "worktree prune", &["worktree", "prune"])
            .await?;
        Ok(())
    }

    async fn delete_branch(&self, repo: &Path, branch: &str) -> Result<(), VcsError> {
        self.git(repo, "branch delete", &["branch", "-D", branch])
            .await?;
        Ok(())
    }

    async fn merge_branch(
        &self,
        repo: &Path,
        branch: &str,
        target: &str,
        message: &str,
    ) -> Result<MergeOutcome, VcsError> {
        self.git(repo, "checkout", &["checkout", target]).await?;

        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(repo)
            .args(["merge", "--no-ff", "-m", message, branch]);
        let output = run_with_timeout(cmd, GIT_TIMEOUT, "merge")
            .await
            .map_err(|e| command_failed("merge", e))?;

        if output.status.success() {
            return Ok(MergeOutcome::Merged);
        }

        let detail = combined_output(&output);
        // Leave the tree clean for the next attempt.
        let _ = self.git(repo, "merge abort", &["merge", "--abort"]).await;
        Ok(MergeOutcome::Conflict(detail))
    }

    async fn diff_against(&self, worktree: &Path, base: &str) -> Result<Diff, VcsError> {
        let range = format!("{base}...HEAD");
        let text = self.git(worktree, "diff", &["diff", &range]).await?;
        let names = self
            .git(worktree, "diff name-only", &["diff", "--name-only", &range])
            .await?;
        let numstat = self
            .git(worktree, "diff numstat", &["diff", "--numstat", &range])
            .await?;

        let files: Vec<String> = names
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();

        let mut additions = 0u64;
        let mut deletions = 0u64;
        for line in numstat.lines() {
            let mut parts = line.split_whitespace();
            // Binary files report "-" for both counts.
            additions += parts.next().and_then(|n| n.parse::<u64>().ok()).unwrap_or(0);
            deletions += parts.next().and_then(|n| n.parse::<u64>().ok()).unwrap_or(0);
        }

        Ok(Diff {
            text,
            stats: DiffStats {
                files,
                additions,
                deletions,
            },
        })
    }

    async fn has_conflicts(
        &self,
        repo: &Path,
        branch: &str,
        target: &str,
    ) -> Result<bool, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(repo)
            .args(["merge-tree", "--write-tree", target, branch]);
        let output = run_with_timeout(cmd, GIT_TIMEOUT, "merge-tree")
            .await
            .map_err(|e| command_failed("merge-tree", e))?;

        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(command_failed("merge-tree", combined_output(&output))),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
