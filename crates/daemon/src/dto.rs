// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed parameters and results for every control-bus method.

use chrono::{DateTime, Utc};
use cosa_core::{Job, Operation, Session, Territory};
use cosa_engine::Worker;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ------------------------------------------------------------- params

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscribeParams {
    /// `["*"]` for everything, or explicit event types.
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerritoryInitParams {
    pub name: String,
    pub repo_root: PathBuf,
    #[serde(default)]
    pub dev_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerritoryAddParams {
    pub name: String,
    pub repo_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerritoryBranchParams {
    pub name: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerAddParams {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerNameParams {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerMessageParams {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobAddParams {
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub operation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobIdParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobAssignParams {
    pub id: String,
    pub worker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPriorityParams {
    pub id: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewJobParams {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationJobDraft {
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationCreateParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub jobs: Vec<OperationJobDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationIdParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSetParams {
    pub worker: String,
    pub orders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderWorkerParams {
    pub worker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSendParams {
    pub message: String,
}

// ------------------------------------------------------------ results

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResult {
    pub uptime_secs: u64,
    pub territory: Option<String>,
    pub workers: usize,
    pub jobs: JobCounts,
    pub queue_ready: usize,
    pub queue_pending: usize,
    pub active_reviews: usize,
    /// Summed across the crew, exact.
    pub total_cost: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobCounts {
    pub pending: usize,
    pub queued: usize,
    pub running: usize,
    pub review: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: String,
    pub description: String,
    pub status: String,
    pub priority: i32,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub assigned_worker: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.as_str().to_string(),
            description: job.description.clone(),
            status: job.status.to_string(),
            priority: job.priority,
            depends_on: job.depends_on.iter().map(|d| d.as_str().to_string()).collect(),
            assigned_worker: job.assigned_worker.as_ref().map(|w| w.as_str().to_string()),
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDetail {
    #[serde(flatten)]
    pub summary: JobSummary,
    pub operation_id: Option<String>,
    pub revision_of: Option<String>,
    pub session_id: Option<String>,
    pub worktree_path: Option<PathBuf>,
    pub branch: Option<String>,
    #[serde(default)]
    pub review_feedback: Vec<String>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub cost: String,
    pub total_tokens: u64,
}

impl From<&Job> for JobDetail {
    fn from(job: &Job) -> Self {
        Self {
            summary: JobSummary::from(job),
            operation_id: job.operation_id.as_ref().map(|o| o.as_str().to_string()),
            revision_of: job.revision_of.as_ref().map(|r| r.as_str().to_string()),
            session_id: job.session_id.as_ref().map(|s| s.as_str().to_string()),
            worktree_path: job.worktree_path.clone(),
            branch: job.branch.clone(),
            review_feedback: job.review_feedback.clone(),
            queued_at: job.queued_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error: job.error.clone(),
            cost: job.cost.to_string(),
            total_tokens: job.total_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerSummary {
    pub id: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub current_job: Option<String>,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub total_cost: String,
    pub total_tokens: u64,
}

impl From<&Worker> for WorkerSummary {
    fn from(worker: &Worker) -> Self {
        let info = worker.info();
        Self {
            id: info.id.as_str().to_string(),
            name: info.name,
            role: info.role.to_string(),
            status: worker.status().to_string(),
            current_job: worker.current_job().map(|j| j.as_str().to_string()),
            jobs_completed: info.jobs_completed,
            jobs_failed: info.jobs_failed,
            total_cost: info.total_cost.to_string(),
            total_tokens: info.total_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerDetail {
    #[serde(flatten)]
    pub summary: WorkerSummary,
    pub session_id: Option<String>,
    #[serde(default)]
    pub standing_orders: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Worker> for WorkerDetail {
    fn from(worker: &Worker) -> Self {
        let info = worker.info();
        Self {
            summary: WorkerSummary::from(worker),
            session_id: info.session_id.as_ref().map(|s| s.as_str().to_string()),
            standing_orders: info.standing_orders,
            created_at: info.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    #[serde(default)]
    pub job_ids: Vec<String>,
}

impl From<&Operation> for OperationSummary {
    fn from(op: &Operation) -> Self {
        Self {
            id: op.id.as_str().to_string(),
            name: op.name.clone(),
            status: op.status.to_string(),
            total: op.total(),
            completed: op.completed,
            failed: op.failed,
            job_ids: op.job_ids.iter().map(|j| j.as_str().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerritorySummary {
    pub name: String,
    pub repo_root: PathBuf,
    pub dev_branch: Option<String>,
    pub active: bool,
}

impl TerritorySummary {
    pub fn from_territory(territory: &Territory, active: bool) -> Self {
        Self {
            name: territory.name.clone(),
            repo_root: territory.repo_root.clone(),
            dev_branch: territory.dev_branch.clone(),
            active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub worker_name: String,
    pub last_used: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.as_str().to_string(),
            worker_name: session.worker_name.clone(),
            last_used: session.last_used,
        }
    }
}
