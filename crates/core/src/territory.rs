// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Territories: project workspaces the daemon operates in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A registered project workspace (one VCS repository root). Jobs and
/// workers operate within the active territory; its dev branch is the
/// merge target for job branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub name: String,
    pub repo_root: PathBuf,
    /// Merge target; falls back to `git.default_merge_branch` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_branch: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Territory {
    pub fn new(name: impl Into<String>, repo_root: PathBuf, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            repo_root,
            dev_branch: None,
            created_at: now,
        }
    }

    /// The branch job work merges into.
    pub fn merge_target<'a>(&'a self, default_branch: &'a str) -> &'a str {
        self.dev_branch.as_deref().unwrap_or(default_branch)
    }
}
