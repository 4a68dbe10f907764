// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Method-table dispatch: one function per method family, a single
//! entry point mapping method names to handlers.
//!
//! Handlers translate engine errors into wire codes and never panic;
//! unknown methods get the standard `-32601`.

use crate::dto::*;
use crate::listener::{ConnId, Subscriptions};
use crate::rpc::RpcError;
use cosa_engine::ops::{self, JobDraft};
use cosa_engine::EngineCtx;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

/// Everything a handler can touch.
pub struct HandlerDeps {
    pub engine: Arc<EngineCtx>,
    pub subs: Arc<Subscriptions>,
    pub shutdown: Arc<Notify>,
    pub start_time: Instant,
}

fn parse<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(RpcError::invalid_params)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::new(crate::rpc::INTERNAL_ERROR, e.to_string()))
}

/// Dispatch one request to its handler.
pub async fn dispatch(
    deps: &HandlerDeps,
    conn: ConnId,
    method: &str,
    params: Option<Value>,
) -> Result<Value, RpcError> {
    let ctx = &deps.engine;
    match method {
        // -- daemon --
        "status" => handle_status(deps),
        "shutdown" => {
            deps.shutdown.notify_one();
            Ok(json!({"shutting_down": true}))
        }
        "subscribe" => {
            let p: SubscribeParams = parse(params)?;
            let filter = if p.events.is_empty() {
                vec!["*".to_string()]
            } else {
                p.events
            };
            deps.subs.subscribe(conn, filter);
            Ok(json!({"subscribed": true}))
        }
        "unsubscribe" => {
            deps.subs.unsubscribe(conn);
            Ok(json!({"subscribed": false}))
        }

        // -- territory --
        "territory.init" => {
            let p: TerritoryInitParams = parse(params)?;
            let territory = ops::territory_init(ctx, &p.name, p.repo_root, p.dev_branch)?;
            to_value(TerritorySummary::from_territory(&territory, true))
        }
        "territory.add" => {
            let p: TerritoryAddParams = parse(params)?;
            let territory = ops::territory_add(ctx, &p.name, p.repo_root)?;
            to_value(TerritorySummary::from_territory(&territory, false))
        }
        "territory.status" => {
            let active = ctx.active_territory();
            match active {
                Some(territory) => to_value(TerritorySummary::from_territory(&territory, true)),
                None => Ok(Value::Null),
            }
        }
        "territory.list" => {
            let active = ctx.active_territory().map(|t| t.name);
            let list: Vec<TerritorySummary> = ctx
                .territories
                .list()
                .iter()
                .map(|t| {
                    TerritorySummary::from_territory(t, active.as_deref() == Some(&t.name))
                })
                .collect();
            to_value(list)
        }
        "territory.setDevBranch" => {
            let p: TerritoryBranchParams = parse(params)?;
            let territory = ops::territory_set_dev_branch(ctx, &p.name, &p.branch)?;
            to_value(TerritorySummary::from_territory(&territory, false))
        }

        // -- worker --
        "worker.add" => {
            let p: WorkerAddParams = parse(params)?;
            let role = p
                .role
                .as_deref()
                .map(cosa_core::WorkerRole::from_str)
                .transpose()
                .map_err(RpcError::invalid_params)?;
            let worker = ops::add_worker(ctx, &p.name, role)?;
            to_value(WorkerSummary::from(worker.as_ref()))
        }
        "worker.list" => {
            let workers: Vec<WorkerSummary> = ctx
                .pool
                .list()
                .iter()
                .map(|w| WorkerSummary::from(w.as_ref()))
                .collect();
            to_value(workers)
        }
        "worker.status" => {
            let p: WorkerNameParams = parse(params)?;
            let worker = ops::get_worker(ctx, &p.name)?;
            to_value(WorkerSummary::from(worker.as_ref()))
        }
        "worker.detail" => {
            let p: WorkerNameParams = parse(params)?;
            let worker = ops::get_worker(ctx, &p.name)?;
            to_value(WorkerDetail::from(worker.as_ref()))
        }
        "worker.remove" => {
            let p: WorkerNameParams = parse(params)?;
            ops::remove_worker(ctx, &p.name)?;
            Ok(json!({"removed": p.name}))
        }
        "worker.message" => {
            let p: WorkerMessageParams = parse(params)?;
            ops::message_worker(ctx, &p.name, &p.message).await?;
            Ok(json!({"delivered": true}))
        }

        // -- job --
        "job.add" => {
            let p: JobAddParams = parse(params)?;
            let job = ops::create_job(
                ctx,
                JobDraft {
                    description: p.description,
                    priority: p.priority,
                    depends_on: p.depends_on,
                },
                p.operation,
            )?;
            to_value(JobDetail::from(&job))
        }
        "job.list" => {
            let jobs: Vec<JobSummary> =
                ops::list_jobs(ctx).iter().map(JobSummary::from).collect();
            to_value(jobs)
        }
        "job.status" => {
            let p: JobIdParams = parse(params)?;
            let job = ops::get_job(ctx, &p.id)?;
            to_value(JobDetail::from(&job))
        }
        "job.cancel" => {
            let p: JobIdParams = parse(params)?;
            let job = ops::cancel_job(ctx, &p.id).await?;
            to_value(JobDetail::from(&job))
        }
        "job.assign" => {
            let p: JobAssignParams = parse(params)?;
            let job = ops::assign_job(ctx, &p.id, &p.worker)?;
            to_value(JobDetail::from(&job))
        }
        "job.setPriority" => {
            let p: JobPriorityParams = parse(params)?;
            let job = ops::set_priority(ctx, &p.id, p.priority)?;
            to_value(JobDetail::from(&job))
        }
        "job.reset" => {
            let p: JobIdParams = parse(params)?;
            let job = ops::reset_job(ctx, &p.id)?;
            to_value(JobDetail::from(&job))
        }
        "queue.status" => {
            let (ready, pending, head) = ops::queue_status(ctx);
            Ok(json!({
                "ready": ready,
                "pending": pending,
                "next": head.map(|j| JobSummary::from(&j)),
            }))
        }

        // -- review --
        "review.start" => {
            let p: ReviewJobParams = parse(params)?;
            ops::start_review(ctx, &p.job_id)?;
            Ok(json!({"started": true}))
        }
        "review.status" => {
            let p: ReviewJobParams = parse(params)?;
            let phase = ops::review_status(ctx, &p.job_id)?;
            to_value(json!({"job_id": p.job_id, "phase": phase}))
        }
        "review.list" => {
            let list: Vec<Value> = ops::list_reviews(ctx)
                .into_iter()
                .map(|(job_id, phase)| json!({"job_id": job_id, "phase": phase}))
                .collect();
            to_value(list)
        }

        // -- operation --
        "operation.create" => {
            let p: OperationCreateParams = parse(params)?;
            let drafts = p
                .jobs
                .into_iter()
                .map(|d| JobDraft {
                    description: d.description,
                    priority: d.priority,
                    depends_on: d.depends_on,
                })
                .collect();
            let operation = ops::create_operation(ctx, &p.name, p.description, drafts)?;
            to_value(OperationSummary::from(&operation))
        }
        "operation.status" => {
            let p: OperationIdParams = parse(params)?;
            let operation = ops::get_operation(ctx, &p.id)?;
            to_value(OperationSummary::from(&operation))
        }
        "operation.list" => {
            let list: Vec<OperationSummary> = ops::list_operations(ctx)
                .iter()
                .map(OperationSummary::from)
                .collect();
            to_value(list)
        }
        "operation.cancel" => {
            let p: OperationIdParams = parse(params)?;
            let operation = ops::cancel_operation(ctx, &p.id).await?;
            to_value(OperationSummary::from(&operation))
        }

        // -- standing orders --
        "order.set" => {
            let p: OrderSetParams = parse(params)?;
            ops::set_orders(ctx, &p.worker, p.orders)?;
            Ok(json!({"ok": true}))
        }
        "order.list" => {
            let p: OrderWorkerParams = parse(params)?;
            to_value(ops::list_orders(ctx, &p.worker)?)
        }
        "order.clear" => {
            let p: OrderWorkerParams = parse(params)?;
            ops::clear_orders(ctx, &p.worker)?;
            Ok(json!({"ok": true}))
        }

        // -- handoff --
        "handoff.generate" => Ok(json!({"handoff": ops::generate_handoff(ctx)})),

        // -- chat --
        "chat.start" => {
            ops::chat_start(ctx).await?;
            Ok(json!({"started": true}))
        }
        "chat.send" => {
            let p: ChatSendParams = parse(params)?;
            let reply = ops::chat_send(ctx, &p.message).await?;
            Ok(json!({"reply": reply}))
        }
        "chat.end" => {
            ops::chat_end(ctx)?;
            Ok(json!({"ended": true}))
        }
        "chat.history" => to_value(ops::chat_history(ctx)?),

        other => Err(RpcError::method_not_found(other)),
    }
}

fn handle_status(deps: &HandlerDeps) -> Result<Value, RpcError> {
    let ctx = &deps.engine;
    let mut counts = JobCounts::default();
    for job in ops::list_jobs(ctx) {
        match job.status {
            cosa_core::JobStatus::Pending => counts.pending += 1,
            cosa_core::JobStatus::Queued => counts.queued += 1,
            cosa_core::JobStatus::Running => counts.running += 1,
            cosa_core::JobStatus::Review => counts.review += 1,
            cosa_core::JobStatus::Completed => counts.completed += 1,
            cosa_core::JobStatus::Failed => counts.failed += 1,
            cosa_core::JobStatus::Cancelled => counts.cancelled += 1,
        }
    }
    let (ready, pending, _) = ops::queue_status(ctx);
    to_value(StatusResult {
        uptime_secs: deps.start_time.elapsed().as_secs(),
        territory: ctx.active_territory().map(|t| t.name),
        workers: ctx.pool.len(),
        jobs: counts,
        queue_ready: ready,
        queue_pending: pending,
        active_reviews: ops::list_reviews(ctx).len(),
        total_cost: ops::total_cost(ctx).to_string(),
    })
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
