// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger entries: the immutable, append-only event vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Globally-unique identifier for a ledger entry.
    pub struct EventId;
}

/// One entry in the append-only ledger. Immutable once written; the
/// payload is opaque JSON whose shape depends on the event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LedgerEvent {
    pub fn new(
        id: EventId,
        event_type: impl Into<String>,
        ts: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            ts,
            payload,
        }
    }
}

/// Well-known event type tags. The ledger accepts arbitrary strings;
/// these are the ones the daemon itself writes.
pub mod types {
    pub const DAEMON_STARTED: &str = "daemon.started";
    pub const DAEMON_SHUTDOWN: &str = "daemon.shutdown";

    pub const JOB_CREATED: &str = "job.created";
    pub const JOB_QUEUED: &str = "job.queued";
    pub const JOB_STARTED: &str = "job.started";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_FAILED: &str = "job.failed";
    pub const JOB_CANCELLED: &str = "job.cancelled";
    pub const JOB_RESET: &str = "job.reset";
    pub const JOB_MERGED: &str = "job.merged";
    pub const JOB_MERGE_CONFLICT: &str = "job.merge_conflict";

    pub const WORKER_ADDED: &str = "worker.added";
    pub const WORKER_REMOVED: &str = "worker.removed";
    pub const WORKER_STUCK: &str = "worker.stuck";

    pub const AGENT_EVENT: &str = "agent.event";

    pub const REVIEW_STARTED: &str = "review.started";
    pub const REVIEW_APPROVED: &str = "review.approved";
    pub const REVIEW_REJECTED: &str = "review.rejected";
    pub const GATE_STARTED: &str = "gate.started";
    pub const GATE_PASSED: &str = "gate.passed";
    pub const GATE_FAILED: &str = "gate.failed";

    pub const OPERATION_CREATED: &str = "operation.created";
    pub const OPERATION_FINISHED: &str = "operation.finished";

    pub const CHAT_STARTED: &str = "chat.started";
    pub const CHAT_MESSAGE: &str = "chat.message";
    pub const CHAT_ENDED: &str = "chat.ended";

    pub const CLEANER_SWEEP: &str = "cleaner.sweep";
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
