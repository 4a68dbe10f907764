// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health monitor (the lookout): periodic stuck-worker detection.
//!
//! A `working` worker whose last agent activity is older than the
//! configured thresholds is escalated through warning, error, and
//! critical. Per-worker severity is remembered so each level notifies
//! once per ascent; the memory clears when the worker leaves `working`.

use crate::ctx::EngineCtx;
use cosa_core::event::types as event_types;
use cosa_core::WorkerStatus;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StuckLevel {
    Warning,
    Error,
    Critical,
}

impl StuckLevel {
    fn as_str(&self) -> &'static str {
        match self {
            StuckLevel::Warning => "warning",
            StuckLevel::Error => "error",
            StuckLevel::Critical => "critical",
        }
    }
}

#[derive(Default)]
pub struct HealthMonitor {
    levels: Mutex<HashMap<String, StuckLevel>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the sweep loop until cancelled.
    pub async fn run(self: Arc<Self>, ctx: Arc<EngineCtx>) {
        let interval = Duration::from_secs(ctx.config.health.interval_secs.max(1));
        loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            self.sweep(&ctx);
        }
        debug!("health monitor stopped");
    }

    /// One sweep over the pool. Public so tests can drive it directly.
    pub fn sweep(&self, ctx: &Arc<EngineCtx>) {
        let config = &ctx.config.health;
        for worker in ctx.pool.list() {
            let name = worker.name();
            if worker.status() != WorkerStatus::Working {
                self.levels.lock().remove(&name);
                continue;
            }

            let age = worker.last_activity_age();
            let level = if age >= Duration::from_secs(config.critical_secs) {
                Some(StuckLevel::Critical)
            } else if age >= Duration::from_secs(config.error_secs) {
                Some(StuckLevel::Error)
            } else if age >= Duration::from_secs(config.warning_secs) {
                Some(StuckLevel::Warning)
            } else {
                None
            };

            let Some(level) = level else {
                self.levels.lock().remove(&name);
                continue;
            };

            // Notify once per ascent; re-sweeps at the same level are quiet.
            let already_at = self.levels.lock().get(&name).copied();
            if already_at.is_some_and(|seen| seen >= level) {
                continue;
            }
            self.levels.lock().insert(name.clone(), level);

            warn!(worker = %name, age_secs = age.as_secs(), level = level.as_str(), "worker stuck");
            ctx.append_event(
                event_types::WORKER_STUCK,
                json!({
                    "worker": &name,
                    "level": level.as_str(),
                    "idle_secs": age.as_secs(),
                    "job_id": worker.current_job().map(|j| j.as_str().to_string()),
                }),
            );
            if ctx.config.notifications.on_worker_stuck {
                ctx.notifier.notify(
                    "cosa: worker stuck",
                    &format!("{name} silent for {}s ({})", age.as_secs(), level.as_str()),
                );
            }

            match level {
                StuckLevel::Warning => {}
                StuckLevel::Error => worker.mark_error(),
                StuckLevel::Critical => worker.stop(),
            }
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
