// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff brief: a markdown snapshot of the whole operation, written
//! for whoever (or whatever) takes over next.

use crate::ctx::EngineCtx;
use cosa_core::{Cost, JobStatus};
use std::fmt::Write as _;
use std::sync::Arc;

/// Number of recent ledger entries included in the brief.
const EVENT_TAIL: usize = 20;

pub fn generate(ctx: &Arc<EngineCtx>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Handoff — {}", ctx.now().format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    match ctx.active_territory() {
        Some(territory) => {
            let _ = writeln!(
                out,
                "Territory: **{}** at `{}` (merge target `{}`)",
                territory.name,
                territory.repo_root.display(),
                territory.merge_target(&ctx.config.git.default_merge_branch),
            );
        }
        None => {
            let _ = writeln!(out, "Territory: none initialized");
        }
    }
    let _ = writeln!(out);

    // Crew.
    let _ = writeln!(out, "## Crew");
    let workers = ctx.pool.list();
    if workers.is_empty() {
        let _ = writeln!(out, "No workers.");
    }
    let mut total_cost = Cost::ZERO;
    for worker in &workers {
        let info = worker.info();
        total_cost += info.total_cost;
        let _ = writeln!(
            out,
            "- **{}** ({}) — {}, {} done / {} failed, {} spent",
            info.name,
            info.role,
            worker.status(),
            info.jobs_completed,
            info.jobs_failed,
            info.total_cost,
        );
    }
    let _ = writeln!(out);

    // Jobs by status.
    let _ = writeln!(out, "## Jobs");
    let jobs = ctx.jobs.list();
    for status in [
        JobStatus::Running,
        JobStatus::Review,
        JobStatus::Queued,
        JobStatus::Pending,
        JobStatus::Failed,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ] {
        let matching: Vec<_> = jobs.iter().filter(|j| j.status == status).collect();
        if matching.is_empty() {
            continue;
        }
        let _ = writeln!(out, "### {} ({})", status, matching.len());
        for job in matching {
            let mut line = format!("- `{}` {}", job.id.short(8), job.description);
            if let Some(error) = &job.error {
                let _ = write!(line, " — {error}");
            }
            let _ = writeln!(out, "{}", line);
        }
    }
    let _ = writeln!(out);

    // Operations.
    let operations = ctx.operations.list();
    if !operations.is_empty() {
        let _ = writeln!(out, "## Operations");
        for op in operations {
            let _ = writeln!(
                out,
                "- **{}** — {} ({}/{} done, {} failed)",
                op.name,
                op.status,
                op.completed,
                op.total(),
                op.failed,
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Total spend across the crew: {total_cost}");
    let _ = writeln!(out);

    // Recent history.
    let _ = writeln!(out, "## Recent events");
    match ctx.ledger.tail(EVENT_TAIL) {
        Ok(events) => {
            for event in events {
                let _ = writeln!(
                    out,
                    "- {} `{}`",
                    event.ts.format("%H:%M:%S"),
                    event.event_type,
                );
            }
        }
        Err(e) => {
            let _ = writeln!(out, "(ledger unreadable: {e})");
        }
    }

    out
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
