// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource cleaner: periodic sweep of aged sessions and orphaned
//! worktrees.
//!
//! A worktree is orphaned when its branch carries the `cosa/` prefix,
//! no live pool member or in-flight job owns it, and its directory
//! mtime is older than the configured threshold.

use crate::ctx::EngineCtx;
use chrono::TimeDelta;
use cosa_core::event::types as event_types;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Counts from one sweep, logged to the ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions_purged: usize,
    pub worktrees_removed: usize,
}

/// Run the sweep loop until cancelled.
pub async fn run(ctx: Arc<EngineCtx>) {
    let interval = Duration::from_secs(ctx.config.cleaner.interval_secs.max(1));
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let report = sweep(&ctx).await;
        ctx.append_event(
            event_types::CLEANER_SWEEP,
            json!({
                "sessions_purged": report.sessions_purged,
                "worktrees_removed": report.worktrees_removed,
            }),
        );
    }
    debug!("cleaner stopped");
}

/// One full sweep. Public so tests can drive it directly.
pub async fn sweep(ctx: &Arc<EngineCtx>) -> SweepReport {
    let mut report = SweepReport::default();

    // 1. Aged sessions.
    let cutoff = ctx.now() - TimeDelta::seconds(ctx.config.cleaner.session_max_age_secs as i64);
    match ctx.sessions.purge_older_than(cutoff) {
        Ok(purged) => report.sessions_purged = purged.len(),
        Err(e) => warn!(error = %e, "session purge failed"),
    }

    // 2. Orphaned worktrees.
    let Some((repo_root, _)) = ctx.merge_context() else {
        return report;
    };
    let worktrees = match ctx.vcs.list_worktrees(&repo_root).await {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "worktree list failed");
            return report;
        }
    };

    // Branches recorded on live pool members' durable records.
    let live_branches: Vec<String> = ctx
        .pool
        .list()
        .iter()
        .filter_map(|w| w.info().branch)
        .collect();
    let max_age = Duration::from_secs(ctx.config.cleaner.worktree_max_age_secs);

    for wt in worktrees {
        let Some(branch) = wt.branch.as_deref() else { continue };
        if !branch.starts_with("cosa/") {
            continue;
        }

        // Live pool members and in-flight jobs keep their worktrees.
        if live_branches.iter().any(|b| b == branch) {
            continue;
        }
        let branch_in_use = ctx
            .jobs
            .list()
            .iter()
            .any(|j| !j.is_terminal() && j.branch.as_deref() == Some(branch));
        if branch_in_use {
            continue;
        }

        if !older_than(&wt.path, max_age) {
            continue;
        }

        debug!(path = %wt.path.display(), branch, "removing orphaned worktree");
        if let Err(e) = ctx.vcs.remove_worktree(&repo_root, &wt.path).await {
            warn!(path = %wt.path.display(), error = %e, "worktree removal failed");
            continue;
        }
        if let Err(e) = ctx.vcs.delete_branch(&repo_root, branch).await {
            warn!(branch, error = %e, "branch delete failed");
        }
        report.worktrees_removed += 1;
    }

    // 3. Registry hygiene.
    if let Err(e) = ctx.vcs.prune_worktrees(&repo_root).await {
        warn!(error = %e, "worktree prune failed");
    }

    report
}

/// Directory mtime as the age proxy; a missing directory counts as old
/// (the registry entry is stale either way).
fn older_than(path: &Path, max_age: Duration) -> bool {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => match SystemTime::now().duration_since(modified) {
            Ok(age) => age > max_age,
            Err(_) => false,
        },
        Err(_) => true,
    }
}

#[cfg(test)]
#[path = "cleaner_tests.rs"]
mod tests;
