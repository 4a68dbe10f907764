// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reviewer boundary: one-shot invocation of a second agent that judges
//! a diff and returns a structured verdict as plain text.

use crate::subprocess::{combined_output, run_with_timeout};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ReviewerError {
    #[error("reviewer invocation failed: {0}")]
    InvocationFailed(String),

    #[error("reviewer exited non-zero: {0}")]
    NonZeroExit(String),
}

/// Synchronous (from the caller's point of view) review invocation.
#[async_trait::async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, prompt: &str, timeout: Duration) -> Result<String, ReviewerError>;
}

/// Runs the agent binary in print mode and captures its response.
#[derive(Debug, Clone)]
pub struct ProcessReviewer {
    pub binary: String,
    pub model: Option<String>,
}

impl ProcessReviewer {
    pub fn new(binary: impl Into<String>, model: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            model,
        }
    }
}

#[async_trait::async_trait]
impl Reviewer for ProcessReviewer {
    async fn review(&self, prompt: &str, timeout: Duration) -> Result<String, ReviewerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p").arg(prompt);
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        let output = run_with_timeout(cmd, timeout, "reviewer")
            .await
            .map_err(ReviewerError::InvocationFailed)?;
        if !output.status.success() {
            return Err(ReviewerError::NonZeroExit(combined_output(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Scripted reviewer for tests: pops queued responses, records prompts.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeReviewer {
    responses: parking_lot::Mutex<std::collections::VecDeque<String>>,
    prompts: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeReviewer {
    pub fn new() -> Self {
        Self {
            responses: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            prompts: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().push_back(response.into());
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeReviewer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait::async_trait]
impl Reviewer for FakeReviewer {
    async fn review(&self, prompt: &str, _timeout: Duration) -> Result<String, ReviewerError> {
        self.prompts.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| ReviewerError::InvocationFailed("no scripted response".to_string()))
    }
}

#[cfg(test)]
#[path = "reviewer_tests.rs"]
mod tests;
