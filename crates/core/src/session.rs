// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted worker/session pairing so a restarted worker can resume its
//! agent's conversational context.

use crate::worker::WorkerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of an agent session, as reported by the agent's `init`
    /// event. May be arbitrarily long; storage hashes it for file names.
    pub struct SessionId;
}

/// One persisted session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl Session {
    pub fn new(
        session_id: SessionId,
        worker_id: WorkerId,
        worker_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            worker_id,
            worker_name: worker_name.into(),
            created_at: now,
            last_used: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_used = now;
    }
}
