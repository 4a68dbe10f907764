// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime.

use thiserror::Error;

/// Errors surfaced to request handlers. Background loops log these and
/// continue; they never propagate out of their tasks.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("operation not found: {0}")]
    OperationNotFound(String),

    #[error("review not found: {0}")]
    ReviewNotFound(String),

    #[error("territory already exists: {0}")]
    TerritoryExists(String),

    #[error("territory not found: {0}")]
    TerritoryNotFound(String),

    #[error("no territory initialized")]
    NoTerritory,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("worker name already in use: {0}")]
    WorkerNameTaken(String),

    #[error("gate failed: {0}")]
    GateFailed(String),

    #[error("merge conflict: {0}")]
    MergeConflict(String),

    #[error(transparent)]
    Domain(#[from] cosa_core::CoreError),

    #[error(transparent)]
    Store(cosa_storage::StoreError),

    #[error("agent error: {0}")]
    Agent(#[from] cosa_adapters::AgentError),

    #[error("vcs error: {0}")]
    Vcs(#[from] cosa_adapters::VcsError),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<cosa_storage::StoreError> for EngineError {
    fn from(e: cosa_storage::StoreError) -> Self {
        match e {
            cosa_storage::StoreError::Domain(core) => EngineError::Domain(core),
            other => EngineError::Store(other),
        }
    }
}
