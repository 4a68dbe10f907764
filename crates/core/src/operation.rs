// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations: named batches of jobs with rolled-up progress.

use crate::job::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for an operation.
    pub struct OperationId;
}

/// Lifecycle of an operation: `pending -> running -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "pending"),
            OperationStatus::Running => write!(f, "running"),
            OperationStatus::Completed => write!(f, "completed"),
            OperationStatus::Failed => write!(f, "failed"),
            OperationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A named batch of jobs. Progress counters are derived from member
/// terminal outcomes; the operation auto-completes once
/// `completed + failed >= total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: OperationStatus,
    #[serde(default)]
    pub job_ids: Vec<JobId>,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub failed: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn new(
        id: OperationId,
        name: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description,
            status: OperationStatus::Pending,
            job_ids: Vec::new(),
            completed: 0,
            failed: 0,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn total(&self) -> u32 {
        self.job_ids.len() as u32
    }

    pub fn add_job(&mut self, id: JobId) {
        self.job_ids.push(id);
    }

    /// Mark the batch running. Idempotent; called when the first member
    /// job leaves the queue.
    pub fn start(&mut self) {
        if self.status == OperationStatus::Pending {
            self.status = OperationStatus::Running;
        }
    }

    /// Record one member job's terminal outcome. Returns `true` when this
    /// call drove the operation to a terminal status.
    pub fn record_result(&mut self, success: bool, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        if self.completed + self.failed >= self.total() {
            self.status = if self.failed > 0 {
                OperationStatus::Failed
            } else {
                OperationStatus::Completed
            };
            self.completed_at = Some(now);
            return true;
        }
        self.start();
        false
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        if !self.status.is_terminal() {
            self.status = OperationStatus::Cancelled;
            self.completed_at = Some(now);
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
