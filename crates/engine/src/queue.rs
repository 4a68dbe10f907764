// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job queue: a priority heap of ready jobs plus a pending pool of
//! dependency-blocked jobs.
//!
//! Ordering is total and strict: higher priority first, ties broken by
//! older `created_at` (FIFO within a priority), final tie on id. A job is
//! ready iff every dependency is `completed`; a failed or cancelled
//! dependency fails the dependent immediately and cascades breadth-first
//! through the pending pool.
//!
//! Lock order: the queue's own mutex first, then the job store's.

use chrono::{DateTime, Utc};
use cosa_core::{Clock, Job, JobStatus};
use cosa_storage::JobStore;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::warn;

/// Where an enqueued job landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// All dependencies satisfied; the job is in the ready heap.
    Ready,
    /// Waiting on at least one dependency.
    Pending,
    /// A dependency had already failed or been cancelled; the job was
    /// failed on the spot (and the cascade ran).
    FailedCascade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReadyEntry {
    priority: i32,
    created_at: DateTime<Utc>,
    id: String,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins, then older created_at, then id.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct PendingEntry {
    priority: i32,
    created_at: DateTime<Utc>,
    depends_on: Vec<String>,
}

#[derive(Default)]
struct QueueInner {
    ready: BinaryHeap<ReadyEntry>,
    pending: HashMap<String, PendingEntry>,
}

/// Priority queue with dependency resolution and cascading failure.
pub struct JobQueue {
    store: Arc<JobStore>,
    clock: Arc<dyn Clock>,
    inner: Mutex<QueueInner>,
}

impl JobQueue {
    pub fn new(store: Arc<JobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            inner: Mutex::new(QueueInner::default()),
        }
    }

    fn dep_state(&self, dep: &str) -> JobStatus {
        // An unknown dependency never satisfies: treated as pending forever.
        self.store
            .get(dep)
            .map(|j| j.status)
            .unwrap_or(JobStatus::Pending)
    }

    /// Admit a job. Only `pending` jobs are accepted; re-enqueueing a
    /// terminal (or in-flight) job is rejected.
    pub fn enqueue(&self, job: &Job) -> EnqueueOutcome {
        if job.status != JobStatus::Pending {
            warn!(job_id = %job.id, status = %job.status, "refusing to enqueue non-pending job");
            return EnqueueOutcome::FailedCascade;
        }

        let mut failed_dep = None;
        let mut all_complete = true;
        for dep in &job.depends_on {
            match self.dep_state(dep.as_str()) {
                JobStatus::Completed => {}
                JobStatus::Failed | JobStatus::Cancelled => {
                    failed_dep = Some(dep.as_str().to_string());
                    break;
                }
                _ => all_complete = false,
            }
        }

        if let Some(dep) = failed_dep {
            // A brand-new job has no dependents yet, so failing it here
            // is the whole cascade.
            self.fail_job(job.id.as_str(), &dep);
            return EnqueueOutcome::FailedCascade;
        }

        let mut inner = self.inner.lock();
        if all_complete {
            inner.ready.push(ReadyEntry {
                priority: job.priority,
                created_at: job.created_at,
                id: job.id.as_str().to_string(),
            });
            EnqueueOutcome::Ready
        } else {
            inner.pending.insert(
                job.id.as_str().to_string(),
                PendingEntry {
                    priority: job.priority,
                    created_at: job.created_at,
                    depends_on: job.depends_on.iter().map(|d| d.as_str().to_string()).collect(),
                },
            );
            EnqueueOutcome::Pending
        }
    }

    /// Pop the highest-priority ready job.
    pub fn dequeue(&self) -> Option<Job> {
        loop {
            let entry = self.inner.lock().ready.pop()?;
            // Stale heap entries (removed or already-claimed jobs) are skipped.
            match self.store.get(&entry.id) {
                Some(job) if job.status == JobStatus::Pending => return Some(job),
                _ => continue,
            }
        }
    }

    /// Non-destructive read of the head.
    pub fn peek(&self) -> Option<Job> {
        let inner = self.inner.lock();
        let entry = inner.ready.peek()?;
        self.store.get(&entry.id)
    }

    /// Remove a job wherever it is. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.pending.remove(id).is_some() {
            return true;
        }
        let before = inner.ready.len();
        if inner.ready.iter().any(|e| e.id == id) {
            let retained: BinaryHeap<ReadyEntry> = inner
                .ready
                .drain()
                .filter(|e| e.id != id)
                .collect();
            inner.ready = retained;
        }
        inner.ready.len() != before
    }

    /// A dependency completed: promote every pending job whose
    /// dependencies are now all complete. Idempotent.
    pub fn notify_completion(&self, _id: &str) {
        let mut inner = self.inner.lock();
        let promotable: Vec<String> = inner
            .pending
            .iter()
            .filter(|(_, entry)| {
                entry
                    .depends_on
                    .iter()
                    .all(|dep| self.dep_state(dep) == JobStatus::Completed)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in promotable {
            if let Some(entry) = inner.pending.remove(&id) {
                inner.ready.push(ReadyEntry {
                    priority: entry.priority,
                    created_at: entry.created_at,
                    id,
                });
            }
        }
    }

    /// A job failed or was cancelled: cascade through the pending pool,
    /// failing every transitive dependent. Returns the ids failed here.
    pub fn notify_failure(&self, id: &str) -> Vec<String> {
        let mut cascaded = Vec::new();
        let mut frontier = VecDeque::from([id.to_string()]);

        while let Some(failed_id) = frontier.pop_front() {
            let dependents: Vec<String> = {
                let inner = self.inner.lock();
                inner
                    .pending
                    .iter()
                    .filter(|(_, entry)| entry.depends_on.iter().any(|d| *d == failed_id))
                    .map(|(id, _)| id.clone())
                    .collect()
            };

            for dependent in dependents {
                if self.inner.lock().pending.remove(&dependent).is_none() {
                    continue;
                }
                self.fail_job(&dependent, &failed_id);
                frontier.push_back(dependent.clone());
                cascaded.push(dependent);
            }
        }
        cascaded
    }

    fn fail_job(&self, id: &str, failed_dep: &str) {
        let now = self.clock.now();
        let reason = format!("dependency failed: {failed_dep}");
        if let Err(e) = self.store.update(id, |job| job.fail(&reason, now)) {
            warn!(job_id = id, error = %e, "cascade fail skipped");
        }
    }

    /// Snapshot of ready jobs in strict priority order, without mutating
    /// the heap.
    pub fn get_ready(&self) -> Vec<Job> {
        let entries: Vec<ReadyEntry> = {
            let inner = self.inner.lock();
            let mut sorted = inner.ready.clone().into_sorted_vec();
            sorted.reverse(); // into_sorted_vec is ascending
            sorted
        };
        entries
            .into_iter()
            .filter_map(|e| self.store.get(&e.id))
            .filter(|j| j.status == JobStatus::Pending)
            .collect()
    }

    pub fn ready_len(&self) -> usize {
        self.inner.lock().ready.len()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
