// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for domain-rule violations.

use thiserror::Error;

/// Errors raised by core state-machine rules.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("reset is only legal from failed or cancelled (job is {status})")]
    InvalidReset { status: String },

    #[error("unknown worker role: {0}")]
    UnknownRole(String),

    #[error("invalid cost amount: {0:?}")]
    InvalidCost(String),
}
