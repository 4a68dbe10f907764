// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted agent sessions.
//!
//! Session ids come from the agent and can be arbitrarily long, so the
//! file name is a sha256 digest of the id (truncated to 32 hex chars);
//! the full id lives inside the record. Two distinct ids can never alias
//! the same file the way a plain-truncation scheme would.

use crate::error::StoreError;
use crate::snapshot;
use chrono::{DateTime, Utc};
use cosa_core::Session;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct SessionStore {
    dir: PathBuf,
    /// Keyed by the full session id.
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let loaded: Vec<Session> = snapshot::load_dir(dir)?;
        let sessions = loaded
            .into_iter()
            .map(|s| (s.session_id.as_str().to_string(), s))
            .collect();
        Ok(Self {
            dir: dir.to_owned(),
            sessions: RwLock::new(sessions),
        })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", digest(session_id)))
    }

    pub fn save(&self, session: Session) -> Result<(), StoreError> {
        let id = session.session_id.as_str().to_string();
        self.sessions.write().insert(id.clone(), session.clone());
        snapshot::write_json_atomic(&self.path_for(&id), &session)
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Most recently used session for a worker name, if any.
    pub fn find_by_worker_name(&self, worker_name: &str) -> Option<Session> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.worker_name == worker_name)
            .max_by_key(|s| s.last_used)
            .cloned()
    }

    pub fn touch(&self, session_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let session = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
            session.touch(now);
            session.clone()
        };
        snapshot::write_json_atomic(&self.path_for(session_id), &session)
    }

    pub fn remove(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().remove(session_id);
        let path = self.path_for(session_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Delete every session whose `last_used` is older than `cutoff`.
    /// Returns the removed records.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>, StoreError> {
        let stale: Vec<Session> = {
            let sessions = self.sessions.read();
            sessions
                .values()
                .filter(|s| s.last_used < cutoff)
                .cloned()
                .collect()
        };
        for session in &stale {
            self.remove(session.session_id.as_str())?;
        }
        Ok(stale)
    }

    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.read().values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

fn digest(session_id: &str) -> String {
    let hash = Sha256::digest(session_id.as_bytes());
    let hex = format!("{hash:x}");
    hex[..32].to_string()
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
