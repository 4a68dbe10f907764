// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent job store: in-memory map plus one snapshot file per job.

use crate::error::StoreError;
use crate::snapshot;
use cosa_core::{CoreError, Job};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Map of jobs keyed by id, written through to `jobs/{id}.json` on every
/// mutation. The daemon owns all jobs; readers get clones.
pub struct JobStore {
    dir: PathBuf,
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    /// Open the store, loading every snapshot in `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let loaded: Vec<Job> = snapshot::load_dir(dir)?;
        let jobs = loaded
            .into_iter()
            .map(|j| (j.id.as_str().to_string(), j))
            .collect();
        Ok(Self {
            dir: dir.to_owned(),
            jobs: RwLock::new(jobs),
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn insert(&self, job: Job) -> Result<(), StoreError> {
        let id = job.id.as_str().to_string();
        {
            let mut jobs = self.jobs.write();
            if jobs.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            jobs.insert(id.clone(), job.clone());
        }
        snapshot::write_json_atomic(&self.path_for(&id), &job)
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.read().contains_key(id)
    }

    /// Apply a mutation under the store lock and persist the result. If
    /// the closure rejects the mutation (domain rule), nothing changes on
    /// disk or in memory.
    pub fn update<F>(&self, id: &str, f: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), CoreError>,
    {
        let updated = {
            let mut jobs = self.jobs.write();
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let mut candidate = job.clone();
            f(&mut candidate)?;
            *job = candidate.clone();
            candidate
        };
        snapshot::write_json_atomic(&self.path_for(id), &updated)?;
        Ok(updated)
    }

    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    pub fn remove(&self, id: &str) -> Result<Job, StoreError> {
        let job = self
            .jobs
            .write()
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let path = self.path_for(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(job)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
