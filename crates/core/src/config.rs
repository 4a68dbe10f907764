// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed daemon configuration.
//!
//! File discovery and parsing happen in the daemon binary; the core only
//! defines the shape and the defaults. Every section and field is
//! optional in the source document.

use crate::worker::WorkerRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for all persistence. The socket and pid file live here unless
    /// overridden.
    pub data_dir: Option<PathBuf>,
    /// Where to listen. Defaults to `{data_dir}/cosa.sock`.
    pub socket_path: Option<PathBuf>,
    pub claude: ClaudeConfig,
    pub workers: WorkersConfig,
    pub git: GitConfig,
    pub gates: GatesConfig,
    pub review: ReviewConfig,
    /// Per-role model overrides, keyed by role name.
    pub models: HashMap<String, String>,
    pub notifications: NotificationsConfig,
    pub health: HealthConfig,
    pub cleaner: CleanerConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Model for a role: per-role override first, then the global model.
    pub fn model_for(&self, role: WorkerRole) -> Option<&str> {
        self.models
            .get(&role.to_string())
            .map(String::as_str)
            .or(self.claude.model.as_deref())
    }
}

/// Agent executable settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeConfig {
    /// Path to the agent binary.
    pub binary: String,
    pub model: Option<String>,
    /// Cap per session, passed as `--max-turns`.
    pub max_turns: Option<u32>,
    /// Seconds to wait for a chat response.
    pub chat_timeout_secs: u64,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            model: None,
            max_turns: None,
            chat_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Soft cap on concurrently busy workers, observed by the scheduler.
    pub max_concurrent: usize,
    /// Role used when `worker.add` omits one.
    pub default_role: WorkerRole,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            default_role: WorkerRole::Soldier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Fallback merge target when the territory has no dev branch.
    pub default_merge_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_merge_branch: "main".to_string(),
        }
    }
}

/// Commands run before review. An unset gate passes vacuously.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatesConfig {
    pub build: Option<String>,
    pub test: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Kick off the review coordinator automatically when a job's agent
    /// succeeds. When off, successful jobs merge directly.
    pub auto: bool,
    /// Wall-clock timeout per gate command.
    pub gate_timeout_secs: u64,
    /// Wall-clock timeout for the reviewer invocation itself.
    pub review_timeout_secs: u64,
    /// Diff truncation cap handed to the reviewer, in characters.
    pub diff_limit: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            auto: false,
            gate_timeout_secs: 300,
            review_timeout_secs: 600,
            diff_limit: 50_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub on_job_complete: bool,
    pub on_job_failed: bool,
    pub on_worker_stuck: bool,
}

/// Stuck-worker detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_secs: u64,
    pub warning_secs: u64,
    pub error_secs: u64,
    pub critical_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            warning_secs: 5 * 60,
            error_secs: 15 * 60,
            critical_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub interval_secs: u64,
    pub session_max_age_secs: u64,
    pub worktree_max_age_secs: u64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 60,
            session_max_age_secs: 7 * 24 * 60 * 60,
            worktree_max_age_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_ms: 100 }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
