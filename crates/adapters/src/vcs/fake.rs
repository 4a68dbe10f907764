// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Vcs`] for tests: records every call, answers from
//! configurable state, and never touches a real repository.

use super::{Diff, DiffStats, MergeOutcome, Vcs, VcsError, WorktreeInfo};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub branch: String,
    pub target: String,
    pub message: String,
}

#[derive(Default)]
struct FakeVcsState {
    worktrees: Vec<WorktreeInfo>,
    merges: Vec<MergeCall>,
    removed_worktrees: Vec<PathBuf>,
    deleted_branches: Vec<String>,
    prune_calls: usize,
    fail_worktree_create: bool,
    conflict_on_merge: bool,
    diff: Option<Diff>,
}

#[derive(Clone, Default)]
pub struct FakeVcs {
    state: Arc<Mutex<FakeVcsState>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_worktree` fail (worktree-provisioning error path).
    pub fn fail_worktree_create(&self) {
        self.state.lock().fail_worktree_create = true;
    }

    /// Make every merge report a conflict.
    pub fn conflict_on_merge(&self) {
        self.state.lock().conflict_on_merge = true;
    }

    /// Override the diff returned by `diff_against`. The default diff
    /// has one changed file.
    pub fn set_diff(&self, diff: Diff) {
        self.state.lock().diff = Some(diff);
    }

    /// An empty diff, for the "no changes to review" path.
    pub fn set_empty_diff(&self) {
        self.set_diff(Diff::default());
    }

    pub fn merges(&self) -> Vec<MergeCall> {
        self.state.lock().merges.clone()
    }

    pub fn removed_worktrees(&self) -> Vec<PathBuf> {
        self.state.lock().removed_worktrees.clone()
    }

    pub fn deleted_branches(&self) -> Vec<String> {
        self.state.lock().deleted_branches.clone()
    }

    pub fn prune_calls(&self) -> usize {
        self.state.lock().prune_calls
    }

    pub fn live_worktrees(&self) -> Vec<WorktreeInfo> {
        self.state.lock().worktrees.clone()
    }

    /// Seed a pre-existing worktree (for cleaner tests).
    pub fn add_worktree(&self, path: PathBuf, branch: Option<String>) {
        self.state.lock().worktrees.push(WorktreeInfo { path, branch });
    }
}

fn default_diff() -> Diff {
    Diff {
        text: "diff --git a/src/lib.rs b/src/lib.rs\n+added line\n".to_string(),
        stats: DiffStats {
            files: vec!["src/lib.rs".to_string()],
            additions: 1,
            deletions: 0,
        },
    }
}

#[async_trait::async_trait]
impl Vcs for FakeVcs {
    async fn create_worktree(
        &self,
        _repo: &Path,
        path: &Path,
        branch: &str,
        _base: &str,
    ) -> Result<(), VcsError> {
        {
            let mut state = self.state.lock();
            if state.fail_worktree_create {
                return Err(VcsError::CommandFailed {
                    action: "worktree add".to_string(),
                    detail: "simulated failure".to_string(),
                });
            }
            state.worktrees.push(WorktreeInfo {
                path: path.to_owned(),
                branch: Some(branch.to_string()),
            });
        }
        // Real worktrees exist on disk; gate commands run inside them.
        let _ = std::fs::create_dir_all(path);
        Ok(())
    }

    async fn remove_worktree(&self, _repo: &Path, path: &Path) -> Result<(), VcsError> {
        {
            let mut state = self.state.lock();
            state.worktrees.retain(|w| w.path != path);
            state.removed_worktrees.push(path.to_owned());
        }
        let _ = std::fs::remove_dir_all(path);
        Ok(())
    }

    async fn list_worktrees(&self, _repo: &Path) -> Result<Vec<WorktreeInfo>, VcsError> {
        Ok(self.state.lock().worktrees.clone())
    }

    async fn prune_worktrees(&self, _repo: &Path) -> Result<(), VcsError> {
        self.state.lock().prune_calls += 1;
        Ok(())
    }

    async fn delete_branch(&self, _repo: &Path, branch: &str) -> Result<(), VcsError> {
        self.state.lock().deleted_branches.push(branch.to_string());
        Ok(())
    }

    async fn merge_branch(
        &self,
        _repo: &Path,
        branch: &str,
        target: &str,
        message: &str,
    ) -> Result<MergeOutcome, VcsError> {
        let mut state = self.state.lock();
        state.merges.push(MergeCall {
            branch: branch.to_string(),
            target: target.to_string(),
            message: message.to_string(),
        });
        if state.conflict_on_merge {
            Ok(MergeOutcome::Conflict("CONFLICT (content): both modified".to_string()))
        } else {
            Ok(MergeOutcome::Merged)
        }
    }

    async fn diff_against(&self, _worktree: &Path, _base: &str) -> Result<Diff, VcsError> {
        Ok(self.state.lock().diff.clone().unwrap_or_else(default_diff))
    }

    async fn has_conflicts(
        &self,
        _repo: &Path,
        _branch: &str,
        _target: &str,
    ) -> Result<bool, VcsError> {
        Ok(self.state.lock().conflict_on_merge)
    }
}
