// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and status state machine.

use crate::clock::Clock;
use crate::cost::Cost;
use crate::error::CoreError;
use crate::operation::OperationId;
use crate::session::SessionId;
use crate::worker::WorkerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Opaque; assigned once at creation and used everywhere a job is
    /// referenced (dependencies, revisions, operations, the ledger).
    pub struct JobId;
}

/// Lifecycle status of a job.
///
/// Legal transitions form a DAG:
/// `pending -> queued -> running -> {review | failed | cancelled}`,
/// `review -> {completed | failed}`, `pending -> cancelled`, and any
/// non-terminal status may fail on catastrophic error. Terminal statuses
/// are never left except through an explicit [`Job::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Freshly created, waiting in (or blocked out of) the ready queue
    Pending,
    /// Claimed by the scheduler and paired with a worker
    Queued,
    /// Agent is executing
    Running,
    /// Agent finished, awaiting gates and review
    Review,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the transition `self -> to` is an edge of the status DAG.
    pub fn can_transition(&self, to: JobStatus) -> bool {
        use JobStatus::*;
        match (self, to) {
            // Catastrophic failure is reachable from any non-terminal status.
            (from, Failed) if !from.is_terminal() => true,
            (Pending, Queued) | (Pending, Cancelled) => true,
            (Queued, Running) => true,
            (Running, Review) | (Running, Cancelled) => true,
            (Review, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Review => write!(f, "review"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Inputs for creating a new job.
#[derive(Debug, Clone, Default)]
pub struct JobSpec {
    pub id: String,
    pub description: String,
    pub priority: i32,
    pub depends_on: Vec<String>,
    pub operation_id: Option<String>,
    pub revision_of: Option<String>,
    pub review_feedback: Vec<String>,
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub description: String,
    /// Higher is more urgent; ties break oldest-first.
    pub priority: i32,
    /// Jobs that must reach `completed` before this one becomes ready.
    #[serde(default)]
    pub depends_on: Vec<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
    /// Set on revision jobs created by a rejected review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_of: Option<JobId>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Reviewer feedback lines carried by revision jobs.
    #[serde(default)]
    pub review_feedback: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cost: Cost,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Job {
    pub fn new(spec: JobSpec, clock: &dyn Clock) -> Self {
        Self {
            id: JobId::new(spec.id),
            description: spec.description,
            priority: spec.priority,
            depends_on: spec.depends_on.into_iter().map(JobId::new).collect(),
            operation_id: spec.operation_id.map(OperationId::new),
            revision_of: spec.revision_of.map(JobId::new),
            status: JobStatus::Pending,
            assigned_worker: None,
            session_id: None,
            worktree_path: None,
            branch: None,
            review_feedback: spec.review_feedback,
            created_at: clock.now(),
            queued_at: None,
            started_at: None,
            completed_at: None,
            error: None,
            cost: Cost::ZERO,
            total_tokens: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition(to) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// Scheduler claimed the job and paired it with a worker.
    pub fn queue(&mut self, worker: WorkerId, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.transition(JobStatus::Queued)?;
        self.assigned_worker = Some(worker);
        self.queued_at = Some(now);
        Ok(())
    }

    /// Agent execution began.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Agent finished successfully; gates and review are next.
    pub fn enter_review(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Review)
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.transition(JobStatus::Completed)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Fail with a reason. Legal from any non-terminal status.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(reason.into());
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.transition(JobStatus::Cancelled)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Return a failed or cancelled job to `pending`, clearing every
    /// execution field so it can be scheduled again from scratch.
    pub fn reset(&mut self) -> Result<(), CoreError> {
        if !matches!(self.status, JobStatus::Failed | JobStatus::Cancelled) {
            return Err(CoreError::InvalidReset {
                status: self.status.to_string(),
            });
        }
        self.status = JobStatus::Pending;
        self.assigned_worker = None;
        self.session_id = None;
        self.worktree_path = None;
        self.branch = None;
        self.review_feedback.clear();
        self.queued_at = None;
        self.started_at = None;
        self.completed_at = None;
        self.error = None;
        self.cost = Cost::ZERO;
        self.total_tokens = 0;
        Ok(())
    }

    /// Record the worktree allocated for this job's execution window.
    pub fn set_worktree(&mut self, path: PathBuf, branch: String) {
        self.worktree_path = Some(path);
        self.branch = Some(branch);
    }

    /// Release the worktree after a successful merge. Retained on failure
    /// for diagnostics.
    pub fn clear_worktree(&mut self) {
        self.worktree_path = None;
        self.branch = None;
    }

    /// Absorb usage counters from the agent's terminal `result` event.
    pub fn absorb_usage(&mut self, cost: Cost, tokens: u64) {
        self.cost += cost;
        self.total_tokens += tokens;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
