// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cosa-storage: the data directory.
//!
//! One daemon instance exclusively owns a data dir. Each entity kind gets
//! a per-entity JSON snapshot written through on every mutation; the
//! ledger is the only append-only file.

pub mod error;
pub mod jobs;
pub mod ledger;
pub mod operations;
pub mod paths;
pub mod sessions;
mod snapshot;
pub mod territories;
pub mod workers;

pub use error::StoreError;
pub use jobs::JobStore;
pub use ledger::{Ledger, LedgerError, LedgerSubscription};
pub use operations::OperationStore;
pub use paths::DataDir;
pub use sessions::SessionStore;
pub use territories::TerritoryStore;
pub use workers::WorkerFiles;
