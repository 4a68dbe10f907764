// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker roles, status, and the durable worker record.

use crate::cost::Cost;
use crate::error::CoreError;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

crate::define_id! {
    /// Stable identifier for a worker, persistent across daemon restarts.
    pub struct WorkerId;
}

/// The family ladder. Only Soldiers and Capos take general jobs from the
/// scheduler; the other roles have dedicated duties (review, health
/// sweeps, cleanup, chat) or exist for operator bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Soldier,
    Capo,
    Consigliere,
    Lookout,
    Cleaner,
    Underboss,
    Associate,
    Don,
}

impl WorkerRole {
    /// Whether the scheduler may hand this role general work.
    pub fn is_job_executor(&self) -> bool {
        matches!(self, WorkerRole::Soldier | WorkerRole::Capo)
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerRole::Soldier => "soldier",
            WorkerRole::Capo => "capo",
            WorkerRole::Consigliere => "consigliere",
            WorkerRole::Lookout => "lookout",
            WorkerRole::Cleaner => "cleaner",
            WorkerRole::Underboss => "underboss",
            WorkerRole::Associate => "associate",
            WorkerRole::Don => "don",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for WorkerRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soldier" => Ok(WorkerRole::Soldier),
            "capo" => Ok(WorkerRole::Capo),
            "consigliere" => Ok(WorkerRole::Consigliere),
            "lookout" => Ok(WorkerRole::Lookout),
            "cleaner" => Ok(WorkerRole::Cleaner),
            "underboss" => Ok(WorkerRole::Underboss),
            "associate" => Ok(WorkerRole::Associate),
            "don" => Ok(WorkerRole::Don),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// Runtime status of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Working,
    Reviewing,
    Stopped,
    Error,
}

impl WorkerStatus {
    /// A busy worker holds a current job (invariant: `current_job` is
    /// non-null iff the status is working or reviewing).
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkerStatus::Working | WorkerStatus::Reviewing)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "idle"),
            WorkerStatus::Working => write!(f, "working"),
            WorkerStatus::Reviewing => write!(f, "reviewing"),
            WorkerStatus::Stopped => write!(f, "stopped"),
            WorkerStatus::Error => write!(f, "error"),
        }
    }
}

/// Durable worker record, written to `workers/{name}.json` on every
/// mutation and reloaded on daemon startup to reconstitute the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub id: WorkerId,
    /// Human name, unique within the pool.
    pub name: String,
    pub role: WorkerRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Free-text lines injected into every job prompt.
    #[serde(default)]
    pub standing_orders: Vec<String>,
    /// Last agent session, used to resume conversational context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub jobs_completed: u64,
    #[serde(default)]
    pub jobs_failed: u64,
    #[serde(default)]
    pub total_cost: Cost,
    #[serde(default)]
    pub total_tokens: u64,
    pub created_at: DateTime<Utc>,
}

impl WorkerInfo {
    pub fn new(
        id: WorkerId,
        name: impl Into<String>,
        role: WorkerRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            worktree_path: None,
            branch: None,
            standing_orders: Vec::new(),
            session_id: None,
            jobs_completed: 0,
            jobs_failed: 0,
            total_cost: Cost::ZERO,
            total_tokens: 0,
            created_at: now,
        }
    }

    /// Absorb usage counters from a finished job.
    pub fn absorb_usage(&mut self, cost: Cost, tokens: u64) {
        self.total_cost += cost;
        self.total_tokens += tokens;
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
