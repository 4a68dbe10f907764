// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable worker records, one file per worker at `workers/{name}.json`.
//!
//! Unlike jobs, the live worker state belongs to the engine's pool; this
//! store only owns the snapshots. On startup the pool loads them as
//! pending records and re-creates runtime workers from them.

use crate::error::StoreError;
use crate::snapshot;
use cosa_core::WorkerInfo;
use std::path::{Path, PathBuf};

pub struct WorkerFiles {
    dir: PathBuf,
}

impl WorkerFiles {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn save(&self, info: &WorkerInfo) -> Result<(), StoreError> {
        snapshot::write_json_atomic(&self.path_for(&info.name), info)
    }

    pub fn load(&self, name: &str) -> Result<WorkerInfo, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        snapshot::read_json(&path)
    }

    /// Load every worker record, skipping unreadable files.
    pub fn load_all(&self) -> Result<Vec<WorkerInfo>, StoreError> {
        let mut infos: Vec<WorkerInfo> = snapshot::load_dir(&self.dir)?;
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
