// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cosa-engine: the job-execution fabric.
//!
//! Queue, pool, scheduler, lifecycle driver, review coordinator, health
//! monitor and cleaner all live here, sharing one [`ctx::EngineCtx`].
//! The daemon crate wires requests into [`ops`]; everything below that
//! line is socket-agnostic and fully exercised by in-crate tests.

pub mod chat;
pub mod cleaner;
pub mod ctx;
pub mod error;
pub mod handoff;
pub mod health;
pub mod lifecycle;
pub mod ops;
pub mod pool;
pub mod prompt;
pub mod queue;
pub mod review;
pub mod scheduler;
pub mod worker;

#[cfg(test)]
mod test_helpers;

pub use ctx::EngineCtx;
pub use error::EngineError;
pub use pool::WorkerPool;
pub use queue::{EnqueueOutcome, JobQueue};
pub use review::{parse_verdict, ReviewPhase, Verdict};
pub use worker::Worker;
