// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime worker: a named, long-lived adapter around one agent session.
//!
//! The durable half ([`WorkerInfo`]) is persisted on every mutation; the
//! runtime half (status, current job, agent control handle, activity
//! clock) lives only in memory. Status and current job share one mutex
//! so the `current_job <=> busy` invariant can never be observed broken.

use crate::error::EngineError;
use cosa_adapters::AgentControl;
use cosa_core::{Cost, JobId, SessionId, WorkerId, WorkerInfo, WorkerRole, WorkerStatus};
use cosa_storage::{StoreError, WorkerFiles};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Runtime {
    status: WorkerStatus,
    current_job: Option<JobId>,
    control: Option<AgentControl>,
    last_activity: Instant,
    /// Test-only extra age added to `last_activity.elapsed()`.
    backdate: Duration,
}

pub struct Worker {
    info: Mutex<WorkerInfo>,
    runtime: Mutex<Runtime>,
    files: Arc<WorkerFiles>,
}

impl Worker {
    pub fn new(info: WorkerInfo, files: Arc<WorkerFiles>) -> Arc<Self> {
        Arc::new(Self {
            info: Mutex::new(info),
            runtime: Mutex::new(Runtime {
                status: WorkerStatus::Idle,
                current_job: None,
                control: None,
                last_activity: Instant::now(),
                backdate: Duration::ZERO,
            }),
            files,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.info.lock().id.clone()
    }

    pub fn name(&self) -> String {
        self.info.lock().name.clone()
    }

    pub fn role(&self) -> WorkerRole {
        self.info.lock().role
    }

    /// Defensive copy of the durable record.
    pub fn info(&self) -> WorkerInfo {
        self.info.lock().clone()
    }

    pub fn status(&self) -> WorkerStatus {
        self.runtime.lock().status
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.runtime.lock().current_job.clone()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.info.lock().session_id.clone()
    }

    pub fn jobs_completed(&self) -> u64 {
        self.info.lock().jobs_completed
    }

    pub fn is_idle(&self) -> bool {
        self.runtime.lock().status == WorkerStatus::Idle
    }

    pub fn is_busy(&self) -> bool {
        self.runtime.lock().status.is_busy()
    }

    // -- activity --

    /// Called on every agent event.
    pub fn touch(&self) {
        let mut runtime = self.runtime.lock();
        runtime.last_activity = Instant::now();
        runtime.backdate = Duration::ZERO;
    }

    pub fn last_activity_age(&self) -> Duration {
        let runtime = self.runtime.lock();
        runtime.last_activity.elapsed() + runtime.backdate
    }

    /// Test hook: pretend the last activity happened `age` ago.
    #[cfg(test)]
    pub(crate) fn backdate_activity(&self, age: Duration) {
        self.runtime.lock().backdate = age;
    }

    // -- job binding --

    /// `idle -> working`, atomically binding the job.
    pub fn begin_job(&self, job: &JobId) -> Result<(), EngineError> {
        let mut runtime = self.runtime.lock();
        if runtime.status != WorkerStatus::Idle {
            return Err(EngineError::InvalidState(format!(
                "worker is {}, not idle",
                runtime.status
            )));
        }
        runtime.status = WorkerStatus::Working;
        runtime.current_job = Some(job.clone());
        runtime.last_activity = Instant::now();
        runtime.backdate = Duration::ZERO;
        Ok(())
    }

    /// `working -> reviewing`; the job stays bound until the review
    /// ends. Also legal from `idle` (restart recovery re-binds the job).
    pub fn begin_review(&self, job: &JobId) {
        let mut runtime = self.runtime.lock();
        match runtime.status {
            WorkerStatus::Working => runtime.status = WorkerStatus::Reviewing,
            WorkerStatus::Idle => {
                runtime.status = WorkerStatus::Reviewing;
                runtime.current_job = Some(job.clone());
            }
            _ => {}
        }
    }

    /// Return to `idle`, clearing the bound job and agent control.
    pub fn finish_job(&self) {
        let mut runtime = self.runtime.lock();
        if matches!(
            runtime.status,
            WorkerStatus::Working | WorkerStatus::Reviewing | WorkerStatus::Error
        ) {
            runtime.status = WorkerStatus::Idle;
        }
        runtime.current_job = None;
        runtime.control = None;
    }

    /// Health monitor: flip a silent worker to `error`. The invariant
    /// requires clearing the bound job with the status change.
    pub fn mark_error(&self) {
        let mut runtime = self.runtime.lock();
        runtime.status = WorkerStatus::Error;
        runtime.current_job = None;
    }

    /// Kill the running agent without changing worker status; the
    /// lifecycle loop observes the stream close and releases the worker.
    pub fn interrupt(&self) {
        if let Some(control) = self.runtime.lock().control.take() {
            control.stop();
        }
    }

    /// Stop the agent (close stdin, then kill) and mark the worker
    /// stopped. A stopped worker is never selected again.
    pub fn stop(&self) {
        let mut runtime = self.runtime.lock();
        if let Some(control) = runtime.control.take() {
            control.stop();
        }
        runtime.status = WorkerStatus::Stopped;
        runtime.current_job = None;
    }

    /// Attach the control handle of the agent now executing this
    /// worker's job.
    pub fn attach_control(&self, control: AgentControl) {
        self.runtime.lock().control = Some(control);
    }

    /// Out-of-band input to the running session. Rejected unless the
    /// worker is `working`.
    pub async fn send_message(&self, text: &str) -> Result<(), EngineError> {
        let control = {
            let runtime = self.runtime.lock();
            if runtime.status != WorkerStatus::Working {
                return Err(EngineError::InvalidState(format!(
                    "worker is {}, not working",
                    runtime.status
                )));
            }
            runtime
                .control
                .clone()
                .ok_or_else(|| EngineError::InvalidState("no active agent session".to_string()))?
        };
        control.send_input(text).await?;
        Ok(())
    }

    // -- durable mutations (write-through) --

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.info.lock().clone();
        self.files.save(&snapshot)
    }

    pub fn set_session(&self, session: SessionId) -> Result<(), StoreError> {
        self.info.lock().session_id = Some(session);
        self.persist()
    }

    /// Fold a finished agent run's usage into the counters.
    pub fn absorb_usage(&self, cost: Cost, tokens: u64) -> Result<(), StoreError> {
        self.info.lock().absorb_usage(cost, tokens);
        self.persist()
    }

    pub fn record_success(&self) -> Result<(), StoreError> {
        self.info.lock().jobs_completed += 1;
        self.persist()
    }

    pub fn record_failure(&self) -> Result<(), StoreError> {
        self.info.lock().jobs_failed += 1;
        self.persist()
    }

    pub fn standing_orders(&self) -> Vec<String> {
        self.info.lock().standing_orders.clone()
    }

    pub fn set_standing_orders(&self, orders: Vec<String>) -> Result<(), StoreError> {
        self.info.lock().standing_orders = orders;
        self.persist()
    }

    pub fn clear_standing_orders(&self) -> Result<(), StoreError> {
        self.info.lock().standing_orders.clear();
        self.persist()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
