// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's request surface.
//!
//! Every control-bus handler bottoms out in one of these functions, and
//! the scenario tests drive them directly. Each call validates state,
//! mutates through the stores, and writes the matching ledger events.

use crate::chat::{ChatMessage, ChatSession};
use crate::ctx::EngineCtx;
use crate::error::EngineError;
use crate::lifecycle;
use crate::review::{self, ReviewPhase};
use crate::worker::Worker;
use cosa_core::event::types as event_types;
use cosa_core::{
    Job, JobSpec, JobStatus, Operation, OperationId, Territory, WorkerId, WorkerInfo, WorkerRole,
    WorkerStatus,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------- jobs

/// Inputs for one new job.
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub description: String,
    pub priority: i32,
    pub depends_on: Vec<String>,
}

pub fn create_job(
    ctx: &Arc<EngineCtx>,
    draft: JobDraft,
    operation_id: Option<String>,
) -> Result<Job, EngineError> {
    if let Some(op_id) = &operation_id {
        if ctx.operations.get(op_id).is_none() {
            return Err(EngineError::OperationNotFound(op_id.clone()));
        }
    }
    for dep in &draft.depends_on {
        if !ctx.jobs.contains(dep) {
            // Unknown dependencies block forever; surface them early.
            return Err(EngineError::JobNotFound(dep.clone()));
        }
    }

    let job = Job::new(
        JobSpec {
            id: ctx.new_id(),
            description: draft.description,
            priority: draft.priority,
            depends_on: draft.depends_on,
            operation_id: operation_id.clone(),
            revision_of: None,
            review_feedback: Vec::new(),
        },
        ctx.clock.as_ref(),
    );
    ctx.jobs.insert(job.clone())?;
    if let Some(op_id) = &operation_id {
        let job_id = job.id.clone();
        ctx.operations
            .update(op_id, move |op| op.add_job(job_id))?;
    }

    ctx.append_event(
        event_types::JOB_CREATED,
        json!({
            "job_id": job.id.as_str(),
            "priority": job.priority,
            "depends_on": job.depends_on.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
            "operation_id": operation_id,
        }),
    );

    if ctx.queue.enqueue(&job) == crate::queue::EnqueueOutcome::FailedCascade {
        if let Some(failed) = ctx.jobs.get(job.id.as_str()) {
            ctx.append_event(
                event_types::JOB_FAILED,
                json!({"job_id": failed.id.as_str(), "error": &failed.error}),
            );
            lifecycle::record_operation_result(ctx, &failed, false);
            return Ok(failed);
        }
    }
    Ok(ctx.jobs.get(job.id.as_str()).unwrap_or(job))
}

pub fn get_job(ctx: &Arc<EngineCtx>, id: &str) -> Result<Job, EngineError> {
    ctx.jobs
        .get(id)
        .ok_or_else(|| EngineError::JobNotFound(id.to_string()))
}

pub fn list_jobs(ctx: &Arc<EngineCtx>) -> Vec<Job> {
    ctx.jobs.list()
}

pub async fn cancel_job(ctx: &Arc<EngineCtx>, id: &str) -> Result<Job, EngineError> {
    let job = get_job(ctx, id)?;
    match job.status {
        JobStatus::Pending => {
            ctx.queue.remove(id);
            let now = ctx.now();
            let cancelled = ctx.jobs.update(id, move |j| j.cancel(now))?;
            ctx.append_event(event_types::JOB_CANCELLED, json!({"job_id": id}));
            lifecycle::cascade_failure(ctx, id);
            lifecycle::record_operation_result(ctx, &cancelled, false);
            Ok(cancelled)
        }
        JobStatus::Running => {
            let now = ctx.now();
            let cancelled = ctx.jobs.update(id, move |j| j.cancel(now))?;
            ctx.append_event(event_types::JOB_CANCELLED, json!({"job_id": id}));
            // Kill the agent; the lifecycle loop sees the stream close,
            // finds the job terminal, and releases the worker.
            if let Some(worker) = job
                .assigned_worker
                .as_ref()
                .and_then(|wid| ctx.pool.get_by_id(wid))
            {
                worker.interrupt();
            }
            lifecycle::cascade_failure(ctx, id);
            lifecycle::record_operation_result(ctx, &cancelled, false);
            Ok(cancelled)
        }
        other => Err(EngineError::InvalidState(format!(
            "cannot cancel a {other} job"
        ))),
    }
}

/// Hand a specific pending job to a specific idle worker, bypassing the
/// scheduler's selection.
pub fn assign_job(
    ctx: &Arc<EngineCtx>,
    job_id: &str,
    worker_name: &str,
) -> Result<Job, EngineError> {
    let job = get_job(ctx, job_id)?;
    if job.status != JobStatus::Pending {
        return Err(EngineError::InvalidState(format!(
            "cannot assign a {} job",
            job.status
        )));
    }
    let worker = ctx
        .pool
        .get(worker_name)
        .ok_or_else(|| EngineError::WorkerNotFound(worker_name.to_string()))?;
    if !worker.is_idle() {
        return Err(EngineError::InvalidState(format!(
            "worker {} is {}",
            worker_name,
            worker.status()
        )));
    }
    if !ctx.queue.remove(job_id) {
        return Err(EngineError::InvalidState(
            "job is not ready (blocked on dependencies)".to_string(),
        ));
    }

    let now = ctx.now();
    let worker_id = worker.id();
    let queued = ctx.jobs.update(job_id, move |j| j.queue(worker_id, now))?;
    if let Err(e) = worker.begin_job(&queued.id) {
        // Lost the claim race; put the job back where the scheduler can
        // see it.
        if let Ok(job) = ctx.jobs.update(job_id, |j| {
            j.status = JobStatus::Pending;
            j.assigned_worker = None;
            j.queued_at = None;
            Ok(())
        }) {
            ctx.queue.enqueue(&job);
        }
        return Err(e);
    }
    ctx.append_event(
        event_types::JOB_QUEUED,
        json!({"job_id": job_id, "worker": worker.name(), "assigned": true}),
    );

    let task_ctx = Arc::clone(ctx);
    let task_job = queued.id.clone();
    ctx.tracker.spawn(async move {
        lifecycle::execute_job(task_ctx, worker, task_job).await;
    });
    Ok(queued)
}

pub fn set_priority(ctx: &Arc<EngineCtx>, id: &str, priority: i32) -> Result<Job, EngineError> {
    let job = get_job(ctx, id)?;
    if job.is_terminal() {
        return Err(EngineError::InvalidState(format!(
            "cannot reprioritize a {} job",
            job.status
        )));
    }
    let updated = ctx.jobs.update(id, move |j| {
        j.priority = priority;
        Ok(())
    })?;
    // Re-seat pending jobs so the heap sees the new priority.
    if updated.status == JobStatus::Pending && ctx.queue.remove(id) {
        ctx.queue.enqueue(&updated);
    }
    Ok(updated)
}

/// Return a failed or cancelled job to `pending` and re-admit it.
pub fn reset_job(ctx: &Arc<EngineCtx>, id: &str) -> Result<Job, EngineError> {
    let reset = ctx.jobs.update(id, |j| j.reset()).map_err(|e| match e {
        cosa_storage::StoreError::NotFound(id) => EngineError::JobNotFound(id),
        other => other.into(),
    })?;
    ctx.append_event(event_types::JOB_RESET, json!({"job_id": id}));
    ctx.queue.enqueue(&reset);
    Ok(reset)
}

/// Ready/pending depth plus the next job in line.
pub fn queue_status(ctx: &Arc<EngineCtx>) -> (usize, usize, Option<Job>) {
    (ctx.queue.ready_len(), ctx.queue.pending_len(), ctx.queue.peek())
}

// ------------------------------------------------------------- workers

pub fn add_worker(
    ctx: &Arc<EngineCtx>,
    name: &str,
    role: Option<WorkerRole>,
) -> Result<Arc<Worker>, EngineError> {
    if ctx.pool.get(name).is_some() {
        return Err(EngineError::WorkerNameTaken(name.to_string()));
    }

    // Reuse the durable record when one survives on disk; otherwise
    // mint a fresh identity.
    let mut info = ctx.pool.take_pending(name).unwrap_or_else(|| {
        WorkerInfo::new(
            WorkerId::new(ctx.new_id()),
            name,
            role.unwrap_or(ctx.config.workers.default_role),
            ctx.now(),
        )
    });

    // A same-named predecessor's session lets the new worker resume its
    // agent's context.
    if info.session_id.is_none() {
        if let Some(session) = ctx.sessions.find_by_worker_name(name) {
            info.session_id = Some(session.session_id);
        }
    }

    let worker = Worker::new(info, ctx.pool.files());
    ctx.pool.add(Arc::clone(&worker))?;
    ctx.append_event(
        event_types::WORKER_ADDED,
        json!({"worker": name, "role": worker.role().to_string()}),
    );
    Ok(worker)
}

pub fn get_worker(ctx: &Arc<EngineCtx>, name: &str) -> Result<Arc<Worker>, EngineError> {
    ctx.pool
        .get(name)
        .ok_or_else(|| EngineError::WorkerNotFound(name.to_string()))
}

pub fn remove_worker(ctx: &Arc<EngineCtx>, name: &str) -> Result<(), EngineError> {
    let worker = ctx.pool.remove(name)?;
    worker.stop();
    ctx.append_event(event_types::WORKER_REMOVED, json!({"worker": name}));
    Ok(())
}

pub async fn message_worker(
    ctx: &Arc<EngineCtx>,
    name: &str,
    text: &str,
) -> Result<(), EngineError> {
    let worker = get_worker(ctx, name)?;
    worker.send_message(text).await
}

// ------------------------------------------------------ standing orders

pub fn set_orders(
    ctx: &Arc<EngineCtx>,
    worker_name: &str,
    orders: Vec<String>,
) -> Result<(), EngineError> {
    let worker = get_worker(ctx, worker_name)?;
    worker.set_standing_orders(orders)?;
    Ok(())
}

pub fn list_orders(ctx: &Arc<EngineCtx>, worker_name: &str) -> Result<Vec<String>, EngineError> {
    Ok(get_worker(ctx, worker_name)?.standing_orders())
}

pub fn clear_orders(ctx: &Arc<EngineCtx>, worker_name: &str) -> Result<(), EngineError> {
    get_worker(ctx, worker_name)?.clear_standing_orders()?;
    Ok(())
}

// ---------------------------------------------------------- operations

pub fn create_operation(
    ctx: &Arc<EngineCtx>,
    name: &str,
    description: Option<String>,
    drafts: Vec<JobDraft>,
) -> Result<Operation, EngineError> {
    let operation = Operation::new(
        OperationId::new(ctx.new_id()),
        name,
        description,
        ctx.now(),
    );
    let op_id = operation.id.as_str().to_string();
    ctx.operations.insert(operation)?;
    ctx.append_event(
        event_types::OPERATION_CREATED,
        json!({"operation_id": &op_id, "name": name, "jobs": drafts.len()}),
    );

    for draft in drafts {
        create_job(ctx, draft, Some(op_id.clone()))?;
    }
    ctx.operations
        .get(&op_id)
        .ok_or_else(|| EngineError::OperationNotFound(op_id))
}

pub fn get_operation(ctx: &Arc<EngineCtx>, id: &str) -> Result<Operation, EngineError> {
    ctx.operations
        .get(id)
        .ok_or_else(|| EngineError::OperationNotFound(id.to_string()))
}

pub fn list_operations(ctx: &Arc<EngineCtx>) -> Vec<Operation> {
    ctx.operations.list()
}

pub async fn cancel_operation(ctx: &Arc<EngineCtx>, id: &str) -> Result<Operation, EngineError> {
    let operation = get_operation(ctx, id)?;
    if operation.status.is_terminal() {
        return Err(EngineError::InvalidState(format!(
            "operation is already {}",
            operation.status
        )));
    }
    // Terminal first, so member cancellations don't roll the batch into
    // a computed completed/failed status underneath us.
    let now = ctx.now();
    let cancelled = ctx
        .operations
        .update(id, move |op| op.mark_cancelled(now))?;
    for job_id in &operation.job_ids {
        // Best effort: members already terminal or mid-review stay put.
        let _ = cancel_job(ctx, job_id.as_str()).await;
    }
    ctx.append_event(
        event_types::OPERATION_FINISHED,
        json!({"operation_id": id, "status": cancelled.status.to_string()}),
    );
    Ok(cancelled)
}

// ----------------------------------------------------------- territory

pub fn territory_init(
    ctx: &Arc<EngineCtx>,
    name: &str,
    repo_root: PathBuf,
    dev_branch: Option<String>,
) -> Result<Territory, EngineError> {
    let mut territory = Territory::new(name, repo_root, ctx.now());
    territory.dev_branch = dev_branch;
    ctx.territories.insert(territory.clone()).map_err(|e| match e {
        cosa_storage::StoreError::AlreadyExists(name) => EngineError::TerritoryExists(name),
        other => other.into(),
    })?;
    ctx.set_active_territory(territory.clone());
    ctx.append_event(
        "territory.init",
        json!({"name": name, "repo_root": &territory.repo_root, "dev_branch": &territory.dev_branch}),
    );
    Ok(territory)
}

/// Register a territory without making it active.
pub fn territory_add(
    ctx: &Arc<EngineCtx>,
    name: &str,
    repo_root: PathBuf,
) -> Result<Territory, EngineError> {
    let territory = Territory::new(name, repo_root, ctx.now());
    ctx.territories.insert(territory.clone()).map_err(|e| match e {
        cosa_storage::StoreError::AlreadyExists(name) => EngineError::TerritoryExists(name),
        other => other.into(),
    })?;
    ctx.append_event(
        "territory.add",
        json!({"name": name, "repo_root": &territory.repo_root}),
    );
    Ok(territory)
}

pub fn territory_set_dev_branch(
    ctx: &Arc<EngineCtx>,
    name: &str,
    branch: &str,
) -> Result<Territory, EngineError> {
    let updated = ctx
        .territories
        .set_dev_branch(name, branch.to_string())
        .map_err(|e| match e {
            cosa_storage::StoreError::NotFound(name) => EngineError::TerritoryNotFound(name),
            other => other.into(),
        })?;
    if ctx
        .active_territory()
        .is_some_and(|active| active.name == name)
    {
        ctx.set_active_territory(updated.clone());
    }
    Ok(updated)
}

// -------------------------------------------------------------- review

/// (Re)start the review coordinator for a job sitting in `review` with
/// no active machine — the restart-recovery path.
pub fn start_review(ctx: &Arc<EngineCtx>, job_id: &str) -> Result<(), EngineError> {
    let job = get_job(ctx, job_id)?;
    if job.status != JobStatus::Review {
        return Err(EngineError::InvalidState(format!(
            "job is {}, not awaiting review",
            job.status
        )));
    }
    if ctx.reviews.phase(job_id).is_some() {
        return Err(EngineError::InvalidState(
            "review already active".to_string(),
        ));
    }
    let worker = job
        .assigned_worker
        .as_ref()
        .and_then(|wid| ctx.pool.get_by_id(wid))
        .ok_or_else(|| {
            EngineError::WorkerNotFound(
                job.assigned_worker
                    .as_ref()
                    .map(|w| w.as_str().to_string())
                    .unwrap_or_default(),
            )
        })?;
    if worker.is_idle() || worker.status() == WorkerStatus::Working {
        worker.begin_review(&job.id);
    }

    let task_ctx = Arc::clone(ctx);
    let task_job = job.id.clone();
    ctx.tracker.spawn(async move {
        review::run_review(task_ctx, worker, task_job).await;
    });
    Ok(())
}

pub fn review_status(ctx: &Arc<EngineCtx>, job_id: &str) -> Result<ReviewPhase, EngineError> {
    ctx.reviews
        .phase(job_id)
        .ok_or_else(|| EngineError::ReviewNotFound(job_id.to_string()))
}

pub fn list_reviews(ctx: &Arc<EngineCtx>) -> Vec<(String, ReviewPhase)> {
    ctx.reviews.list()
}

// ---------------------------------------------------------------- chat

pub async fn chat_start(ctx: &Arc<EngineCtx>) -> Result<(), EngineError> {
    if ctx.chat().is_some() {
        return Err(EngineError::InvalidState(
            "chat session already active".to_string(),
        ));
    }
    let session = ChatSession::start(ctx).await?;
    ctx.set_chat(session);
    ctx.append_event(event_types::CHAT_STARTED, json!({}));
    Ok(())
}

pub async fn chat_send(ctx: &Arc<EngineCtx>, text: &str) -> Result<String, EngineError> {
    let chat = ctx
        .chat()
        .ok_or_else(|| EngineError::InvalidState("no active chat session".to_string()))?;
    let timeout = Duration::from_secs(ctx.config.claude.chat_timeout_secs);
    let reply = chat.send(text, timeout, ctx.now()).await?;
    ctx.append_event(
        event_types::CHAT_MESSAGE,
        json!({"user": text, "assistant": &reply}),
    );
    Ok(reply)
}

pub fn chat_end(ctx: &Arc<EngineCtx>) -> Result<(), EngineError> {
    let chat = ctx
        .take_chat()
        .ok_or_else(|| EngineError::InvalidState("no active chat session".to_string()))?;
    chat.end();
    ctx.append_event(event_types::CHAT_ENDED, json!({}));
    Ok(())
}

pub fn chat_history(ctx: &Arc<EngineCtx>) -> Result<Vec<ChatMessage>, EngineError> {
    let chat = ctx
        .chat()
        .ok_or_else(|| EngineError::InvalidState("no active chat session".to_string()))?;
    Ok(chat.history())
}

// ------------------------------------------------------------- handoff

pub fn generate_handoff(ctx: &Arc<EngineCtx>) -> String {
    crate::handoff::generate(ctx)
}

/// Exact total spend across the crew (summed, not last-writer-wins).
pub fn total_cost(ctx: &Arc<EngineCtx>) -> cosa_core::Cost {
    let mut total = cosa_core::Cost::ZERO;
    for worker in ctx.pool.list() {
        total += worker.info().total_cost;
    }
    total
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
