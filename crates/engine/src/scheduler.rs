// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler: a tick loop that marries ready jobs to idle workers.
//!
//! Each tick snapshots the ready queue (so jobs added mid-tick wait for
//! the next one — no starvation of large batches), claims jobs in strict
//! priority order, and spawns a detached lifecycle task per pairing.
//! Missing a tick is benign: readiness only grows.

use crate::ctx::EngineCtx;
use crate::lifecycle;
use cosa_core::event::types as event_types;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Run the tick loop until the root token cancels.
pub async fn run(ctx: Arc<EngineCtx>) {
    let tick = Duration::from_millis(ctx.config.scheduler.tick_ms.max(1));
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(tick) => {}
        }
        tick_once(&ctx);
    }
    debug!("scheduler stopped");
}

/// One matching pass. Separated from the loop so tests can drive ticks
/// deterministically.
pub fn tick_once(ctx: &Arc<EngineCtx>) {
    let ready = ctx.queue.get_ready();
    if ready.is_empty() {
        return;
    }

    let max_concurrent = ctx.config.workers.max_concurrent;
    for job in ready {
        if ctx.pool.busy_count() >= max_concurrent {
            debug!("concurrency cap reached, deferring remaining ready jobs");
            break;
        }
        let Some(worker) = ctx.pool.find_best() else {
            continue;
        };

        if !ctx.queue.remove(job.id.as_str()) {
            continue; // another claimant won the race
        }

        let now = ctx.now();
        let worker_id = worker.id();
        let queued = ctx
            .jobs
            .update(job.id.as_str(), move |j| j.queue(worker_id, now));
        let job = match queued {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "queue transition failed");
                continue;
            }
        };

        if let Err(e) = worker.begin_job(&job.id) {
            // The worker got busy between selection and claim; put the
            // job back where the next tick can see it.
            warn!(job_id = %job.id, worker = %worker.name(), error = %e, "worker claim lost");
            let id = job.id.clone();
            if let Ok(job) = ctx.jobs.update(id.as_str(), |j| {
                j.status = cosa_core::JobStatus::Pending;
                j.assigned_worker = None;
                j.queued_at = None;
                Ok(())
            }) {
                ctx.queue.enqueue(&job);
            }
            continue;
        }

        ctx.append_event(
            event_types::JOB_QUEUED,
            json!({"job_id": job.id.as_str(), "worker": worker.name()}),
        );

        let task_ctx = Arc::clone(ctx);
        let task_job = job.id.clone();
        ctx.tracker.spawn(async move {
            lifecycle::execute_job(task_ctx, worker, task_job).await;
        });
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
