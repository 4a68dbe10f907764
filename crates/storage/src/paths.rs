// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data directory layout.

use std::io;
use std::path::{Path, PathBuf};

/// Well-known locations under the daemon's data directory:
///
/// ```text
/// {root}/cosa.sock          control socket
/// {root}/cosad.pid          daemon pid (flock-guarded)
/// {root}/cosad.log          daemon log file
/// {root}/events.jsonl       ledger, append only
/// {root}/jobs/{id}.json     one snapshot per job
/// {root}/workers/{name}.json
/// {root}/sessions/{digest}.json
/// {root}/operations/{id}.json
/// {root}/territories.json
/// ```
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn socket_path(&self) -> PathBuf {
        self.root.join("cosa.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root.join("cosad.pid")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("cosad.log")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn workers_dir(&self) -> PathBuf {
        self.root.join("workers")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn operations_dir(&self) -> PathBuf {
        self.root.join("operations")
    }

    pub fn territories_path(&self) -> PathBuf {
        self.root.join("territories.json")
    }

    /// Directory where job worktrees are provisioned.
    pub fn worktrees_dir(&self) -> PathBuf {
        self.root.join("worktrees")
    }

    /// Create the root and every entity directory.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.jobs_dir())?;
        std::fs::create_dir_all(self.workers_dir())?;
        std::fs::create_dir_all(self.sessions_dir())?;
        std::fs::create_dir_all(self.operations_dir())?;
        std::fs::create_dir_all(self.worktrees_dir())?;
        Ok(())
    }
}
