// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle driver: one invocation per job/worker pairing.
//!
//! Provision the worktree, run the agent, absorb its usage, then route
//! the outcome: direct merge (default), the review coordinator
//! (`review.auto`), or the failure path with its dependency cascade.

use crate::ctx::EngineCtx;
use crate::prompt;
use crate::review;
use crate::worker::Worker;
use cosa_adapters::{LaunchSpec, MergeOutcome};
use cosa_core::event::types as event_types;
use cosa_core::{AgentEvent, Cost, Job, JobId, Session, SessionId};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the agent run produced.
struct RunOutcome {
    success: bool,
    saw_result: bool,
    cost: Cost,
    tokens: u64,
    last_error: Option<String>,
    cancelled: bool,
}

/// Drive one job to a terminal state (or hand it to the review
/// coordinator). Runs as a detached tracked task; errors never escape.
pub async fn execute_job(ctx: Arc<EngineCtx>, worker: Arc<Worker>, job_id: JobId) {
    let Some((repo_root, merge_target)) = ctx.merge_context() else {
        fail_job(&ctx, &worker, &job_id, "no territory initialized").await;
        return;
    };

    // 1. Allocate the worktree: a fresh branch off the merge target.
    let branch = format!("cosa/job/{}", job_id.short(8));
    let worktree = ctx.data.worktrees_dir().join(job_id.as_str());
    if let Err(e) = ctx
        .vcs
        .create_worktree(&repo_root, &worktree, &branch, &merge_target)
        .await
    {
        fail_job(&ctx, &worker, &job_id, &format!("worktree allocation failed: {e}")).await;
        return;
    }

    let now = ctx.now();
    let branch_clone = branch.clone();
    let worktree_clone = worktree.clone();
    let started = ctx.jobs.update(job_id.as_str(), move |job| {
        job.set_worktree(worktree_clone, branch_clone);
        job.start(now)
    });
    let job = match started {
        Ok(job) => job,
        Err(e) => {
            fail_job(&ctx, &worker, &job_id, &format!("failed to start: {e}")).await;
            return;
        }
    };

    // 2. Log the start.
    ctx.append_event(
        event_types::JOB_STARTED,
        json!({"job_id": job_id.as_str(), "worker": worker.name(), "branch": &branch}),
    );
    if let Some(op_id) = &job.operation_id {
        let _ = ctx.operations.update(op_id.as_str(), |op| op.start());
    }

    // 3. Execute the agent and stream its events into the ledger.
    let outcome = match run_agent(&ctx, &worker, &job, worktree.clone(), &merge_target).await {
        Ok(outcome) => outcome,
        Err(e) => {
            fail_job(&ctx, &worker, &job_id, &format!("agent launch failed: {e}")).await;
            return;
        }
    };

    // A cancel request already put the job in a terminal state; the only
    // work left is releasing the worker.
    if let Some(job) = ctx.jobs.get(job_id.as_str()) {
        if job.is_terminal() {
            worker.finish_job();
            return;
        }
    }

    let now = ctx.now();
    let (cost, tokens) = (outcome.cost, outcome.tokens);
    let _ = ctx
        .jobs
        .update(job_id.as_str(), |job| {
            job.absorb_usage(cost, tokens);
            Ok(())
        });
    if let Err(e) = worker.absorb_usage(cost, tokens) {
        warn!(worker = %worker.name(), error = %e, "failed to persist worker usage");
    }

    if outcome.cancelled {
        let _ = ctx.jobs.update(job_id.as_str(), |job| {
            job.fail("cancelled: daemon shutting down", now)
        });
        ctx.append_event(
            event_types::JOB_FAILED,
            json!({"job_id": job_id.as_str(), "error": "cancelled: daemon shutting down"}),
        );
        worker.finish_job();
        return;
    }

    // 4. Route the outcome.
    if outcome.success && outcome.saw_result {
        if let Err(e) = ctx.jobs.update(job_id.as_str(), |job| job.enter_review()) {
            error!(job_id = %job_id, error = %e, "could not enter review");
            fail_job(&ctx, &worker, &job_id, "internal: review transition failed").await;
            return;
        }

        if ctx.config.review.auto {
            worker.begin_review(&job_id);
            let review_ctx = Arc::clone(&ctx);
            let review_worker = Arc::clone(&worker);
            let review_job = job_id.clone();
            ctx.tracker.spawn(async move {
                review::run_review(review_ctx, review_worker, review_job).await;
            });
        } else {
            finalize_direct_merge(&ctx, &worker, &job_id, &repo_root, &merge_target, &branch, &worktree)
                .await;
        }
    } else {
        let reason = outcome
            .last_error
            .unwrap_or_else(|| "agent stream closed without result".to_string());
        fail_job(&ctx, &worker, &job_id, &reason).await;
    }
}

/// Launch (or resume) the worker's agent and consume its event stream.
async fn run_agent(
    ctx: &Arc<EngineCtx>,
    worker: &Arc<Worker>,
    job: &Job,
    worktree: PathBuf,
    merge_target: &str,
) -> Result<RunOutcome, cosa_adapters::AgentError> {
    let info = worker.info();
    let spec = LaunchSpec {
        binary: ctx.config.claude.binary.clone(),
        prompt: prompt::compose_job_prompt(&info, job, merge_target),
        cwd: Some(worktree),
        model: ctx.config.model_for(info.role).map(str::to_string),
        max_turns: ctx.config.claude.max_turns,
        resume_session: info.session_id.as_ref().map(|s| s.as_str().to_string()),
    };

    let mut handle = ctx.launcher.launch(spec).await?;
    worker.attach_control(handle.control.clone());

    let mut outcome = RunOutcome {
        success: false,
        saw_result: false,
        cost: Cost::ZERO,
        tokens: 0,
        last_error: None,
        cancelled: false,
    };

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                handle.control.stop();
                outcome.cancelled = true;
                break;
            }
            event = handle.events.recv() => {
                let Some(event) = event else { break };
                worker.touch();
                ctx.append_event(
                    event_types::AGENT_EVENT,
                    json!({
                        "job_id": job.id.as_str(),
                        "worker": worker.name(),
                        "kind": event.kind(),
                        "event": &event,
                    }),
                );
                match event {
                    AgentEvent::Init { session_id } if !session_id.is_empty() => {
                        latch_session(ctx, worker, &job.id, &session_id);
                    }
                    AgentEvent::Result { success, total_cost, total_tokens } => {
                        outcome.saw_result = true;
                        outcome.success = success;
                        outcome.tokens = total_tokens;
                        outcome.cost = Cost::parse(&total_cost).unwrap_or(Cost::ZERO);
                        if !success && outcome.last_error.is_none() {
                            outcome.last_error = Some("agent reported failure".to_string());
                        }
                    }
                    AgentEvent::Error { message } => {
                        outcome.last_error = Some(message);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(outcome)
}

/// Persist the session triple (job, worker record, session store) as
/// soon as the agent announces it.
fn latch_session(ctx: &Arc<EngineCtx>, worker: &Arc<Worker>, job_id: &JobId, session_id: &str) {
    let sid = SessionId::new(session_id);
    let sid_for_job = sid.clone();
    let _ = ctx.jobs.update(job_id.as_str(), move |job| {
        job.session_id = Some(sid_for_job);
        Ok(())
    });
    if let Err(e) = worker.set_session(sid.clone()) {
        warn!(worker = %worker.name(), error = %e, "failed to persist worker session");
    }
    let now = ctx.now();
    let result = if ctx.sessions.get(session_id).is_some() {
        ctx.sessions.touch(session_id, now)
    } else {
        ctx.sessions
            .save(Session::new(sid, worker.id(), worker.name(), now))
    };
    if let Err(e) = result {
        warn!(session = session_id, error = %e, "failed to persist session");
    }
}

/// Post-completion path without review: remove the worktree, merge, and
/// complete. A merge conflict is a diagnostic, not a failure.
#[allow(clippy::too_many_arguments)]
async fn finalize_direct_merge(
    ctx: &Arc<EngineCtx>,
    worker: &Arc<Worker>,
    job_id: &JobId,
    repo_root: &std::path::Path,
    merge_target: &str,
    branch: &str,
    worktree: &std::path::Path,
) {
    if let Err(e) = ctx.vcs.remove_worktree(repo_root, worktree).await {
        warn!(job_id = %job_id, error = %e, "worktree removal failed");
    }

    let message = format!("Merge job {} into {}", job_id.short(8), merge_target);
    let merged = {
        // One merge at a time against the shared repository HEAD.
        let _merge_guard = ctx.merge_lock.lock().await;
        match ctx
            .vcs
            .merge_branch(repo_root, branch, merge_target, &message)
            .await
        {
            Ok(MergeOutcome::Merged) => {
                if let Err(e) = ctx.vcs.delete_branch(repo_root, branch).await {
                    warn!(branch, error = %e, "branch delete failed");
                }
                ctx.append_event(
                    event_types::JOB_MERGED,
                    json!({"job_id": job_id.as_str(), "branch": branch, "target": merge_target}),
                );
                true
            }
            Ok(MergeOutcome::Conflict(detail)) => {
                ctx.append_event(
                    event_types::JOB_MERGE_CONFLICT,
                    json!({"job_id": job_id.as_str(), "branch": branch, "detail": detail}),
                );
                false
            }
            Err(e) => {
                ctx.append_event(
                    event_types::JOB_MERGE_CONFLICT,
                    json!({"job_id": job_id.as_str(), "branch": branch, "detail": e.to_string()}),
                );
                false
            }
        }
    };

    let now = ctx.now();
    let completed = ctx.jobs.update(job_id.as_str(), move |job| {
        if merged {
            job.clear_worktree();
        }
        job.complete(now)
    });
    match completed {
        Ok(job) => finish_success(ctx, worker, &job).await,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "completion transition failed");
            worker.finish_job();
        }
    }
}

/// Shared success epilogue: counters, queue unblocking, rollup,
/// notification. The job must already be `completed` in the store.
pub(crate) async fn finish_success(ctx: &Arc<EngineCtx>, worker: &Arc<Worker>, job: &Job) {
    if let Err(e) = worker.record_success() {
        warn!(worker = %worker.name(), error = %e, "failed to persist worker counters");
    }
    worker.finish_job();

    ctx.append_event(
        event_types::JOB_COMPLETED,
        json!({"job_id": job.id.as_str(), "worker": worker.name(), "cost": job.cost.to_string(), "tokens": job.total_tokens}),
    );
    ctx.queue.notify_completion(job.id.as_str());
    record_operation_result(ctx, job, true);

    if ctx.config.notifications.on_job_complete {
        ctx.notifier.notify(
            "cosa: job completed",
            &format!("{} ({})", job.description, job.id.short(8)),
        );
    }
    info!(job_id = %job.id, "job completed");
}

/// Shared failure epilogue: terminal transition, counters, cascade,
/// rollup, notification.
pub(crate) async fn fail_job(
    ctx: &Arc<EngineCtx>,
    worker: &Arc<Worker>,
    job_id: &JobId,
    reason: &str,
) {
    let now = ctx.now();
    let reason_owned = reason.to_string();
    match ctx
        .jobs
        .update(job_id.as_str(), move |job| job.fail(reason_owned, now))
    {
        Ok(_) => {
            ctx.append_event(
                event_types::JOB_FAILED,
                json!({"job_id": job_id.as_str(), "error": reason}),
            );
        }
        // Already terminal (e.g. cancelled mid-run): nothing to do.
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "failure transition skipped");
        }
    }

    if let Err(e) = worker.record_failure() {
        warn!(worker = %worker.name(), error = %e, "failed to persist worker counters");
    }
    worker.finish_job();
    cascade_failure(ctx, job_id.as_str());

    if let Some(job) = ctx.jobs.get(job_id.as_str()) {
        record_operation_result(ctx, &job, false);
        if ctx.config.notifications.on_job_failed {
            ctx.notifier.notify(
                "cosa: job failed",
                &format!("{} ({}): {}", job.description, job.id.short(8), reason),
            );
        }
    }
}

/// Run the queue's failure cascade and account for every job it took
/// down (ledger events + operation rollups).
pub(crate) fn cascade_failure(ctx: &Arc<EngineCtx>, job_id: &str) {
    for cascaded in ctx.queue.notify_failure(job_id) {
        ctx.append_event(
            event_types::JOB_FAILED,
            json!({"job_id": &cascaded, "error": format!("dependency failed: {job_id}")}),
        );
        if let Some(job) = ctx.jobs.get(&cascaded) {
            record_operation_result(ctx, &job, false);
        }
    }
}

/// Roll a member job's terminal outcome into its operation.
pub(crate) fn record_operation_result(ctx: &Arc<EngineCtx>, job: &Job, success: bool) {
    let Some(op_id) = &job.operation_id else { return };
    let now = ctx.now();
    match ctx.operations.update(op_id.as_str(), |op| {
        op.record_result(success, now);
    }) {
        Ok(op) if op.status.is_terminal() => {
            ctx.append_event(
                event_types::OPERATION_FINISHED,
                json!({
                    "operation_id": op.id.as_str(),
                    "status": op.status.to_string(),
                    "completed": op.completed,
                    "failed": op.failed,
                }),
            );
        }
        Ok(_) => {}
        Err(e) => warn!(operation = %op_id, error = %e, "operation rollup failed"),
    }
}
