// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: the registry of live workers plus the pending records
//! loaded from disk at startup.
//!
//! Selection is load-aware and biased: `score = 1000 - jobs_completed +
//! 100 for Soldiers`, so the least-loaded idle executor wins and Capos
//! stay in reserve for coordination duties until Soldiers run dry.

use crate::error::EngineError;
use crate::worker::Worker;
use cosa_core::WorkerInfo;
use cosa_storage::{StoreError, WorkerFiles};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

const LOAD_BASE: i64 = 1000;
const SOLDIER_BIAS: i64 = 100;

struct PoolInner {
    workers: HashMap<String, Arc<Worker>>,
    /// Durable records loaded at startup, waiting for the daemon to
    /// re-create their runtime state and call [`WorkerPool::add`].
    pending: Vec<WorkerInfo>,
}

pub struct WorkerPool {
    files: Arc<WorkerFiles>,
    inner: RwLock<PoolInner>,
}

impl WorkerPool {
    /// Open the pool, loading persisted worker records as pending.
    pub fn open(files: WorkerFiles) -> Result<Self, StoreError> {
        let pending = files.load_all()?;
        Ok(Self {
            files: Arc::new(files),
            inner: RwLock::new(PoolInner {
                workers: HashMap::new(),
                pending,
            }),
        })
    }

    pub fn files(&self) -> Arc<WorkerFiles> {
        Arc::clone(&self.files)
    }

    /// Records still awaiting reconstitution.
    pub fn pending(&self) -> Vec<WorkerInfo> {
        self.inner.read().pending.clone()
    }

    /// Claim a pending record by name, removing it from the list.
    pub fn take_pending(&self, name: &str) -> Option<WorkerInfo> {
        let mut inner = self.inner.write();
        let pos = inner.pending.iter().position(|w| w.name == name)?;
        Some(inner.pending.remove(pos))
    }

    /// Register a live worker. Name uniqueness is enforced here.
    pub fn add(&self, worker: Arc<Worker>) -> Result<(), EngineError> {
        let name = worker.name();
        {
            let mut inner = self.inner.write();
            if inner.workers.contains_key(&name) {
                return Err(EngineError::WorkerNameTaken(name));
            }
            inner.pending.retain(|w| w.name != name);
            inner.workers.insert(name, Arc::clone(&worker));
        }
        self.files.save(&worker.info())?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Worker>> {
        self.inner.read().workers.get(name).cloned()
    }

    pub fn get_by_id(&self, id: &cosa_core::WorkerId) -> Option<Arc<Worker>> {
        self.inner
            .read()
            .workers
            .values()
            .find(|w| &w.id() == id)
            .cloned()
    }

    /// Detach a worker from the pool and delete its durable record. Its
    /// sessions stay behind so a same-named worker can resume later.
    pub fn remove(&self, name: &str) -> Result<Arc<Worker>, EngineError> {
        let worker = self
            .inner
            .write()
            .workers
            .remove(name)
            .ok_or_else(|| EngineError::WorkerNotFound(name.to_string()))?;
        self.files.remove(name)?;
        Ok(worker)
    }

    pub fn list(&self) -> Vec<Arc<Worker>> {
        let mut workers: Vec<Arc<Worker>> =
            self.inner.read().workers.values().cloned().collect();
        workers.sort_by_key(|w| w.name());
        workers
    }

    pub fn len(&self) -> usize {
        self.inner.read().workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().workers.is_empty()
    }

    /// Workers currently bound to a job (or its review).
    pub fn busy_count(&self) -> usize {
        self.inner
            .read()
            .workers
            .values()
            .filter(|w| w.is_busy())
            .count()
    }

    /// Pick the best idle executor for a job, if any.
    ///
    /// Only idle Soldiers and Capos are considered. Fewer completed jobs
    /// means a higher score, with a fixed bias toward Soldiers; the
    /// load term dominates until a worker has completed over 1000 jobs.
    pub fn find_best(&self) -> Option<Arc<Worker>> {
        let inner = self.inner.read();
        let mut best: Option<(i64, Arc<Worker>)> = None;
        for worker in inner.workers.values() {
            if !worker.role().is_job_executor() || !worker.is_idle() {
                continue;
            }
            let mut score = LOAD_BASE - worker.jobs_completed() as i64;
            if worker.role() == cosa_core::WorkerRole::Soldier {
                score += SOLDIER_BIAS;
            }
            // Strict greater-than keeps the first candidate on ties.
            match &best {
                Some((best_score, _)) if score <= *best_score => {}
                _ => best = Some((score, Arc::clone(worker))),
            }
        }
        best.map(|(_, worker)| worker)
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
