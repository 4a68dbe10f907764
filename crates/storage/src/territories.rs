// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of project workspaces, persisted as a single JSON file.

use crate::error::StoreError;
use crate::snapshot;
use cosa_core::Territory;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct TerritoryStore {
    path: PathBuf,
    territories: RwLock<BTreeMap<String, Territory>>,
}

impl TerritoryStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let territories = if path.exists() {
            let list: Vec<Territory> = snapshot::read_json(path)?;
            list.into_iter().map(|t| (t.name.clone(), t)).collect()
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_owned(),
            territories: RwLock::new(territories),
        })
    }

    fn persist(&self, snapshot_list: Vec<Territory>) -> Result<(), StoreError> {
        snapshot::write_json_atomic(&self.path, &snapshot_list)
    }

    /// Register a territory. Fails if the name is taken.
    pub fn insert(&self, territory: Territory) -> Result<(), StoreError> {
        let snapshot_list = {
            let mut territories = self.territories.write();
            if territories.contains_key(&territory.name) {
                return Err(StoreError::AlreadyExists(territory.name));
            }
            territories.insert(territory.name.clone(), territory);
            territories.values().cloned().collect()
        };
        self.persist(snapshot_list)
    }

    pub fn get(&self, name: &str) -> Option<Territory> {
        self.territories.read().get(name).cloned()
    }

    pub fn list(&self) -> Vec<Territory> {
        self.territories.read().values().cloned().collect()
    }

    pub fn set_dev_branch(&self, name: &str, branch: String) -> Result<Territory, StoreError> {
        let (updated, snapshot_list) = {
            let mut territories = self.territories.write();
            let territory = territories
                .get_mut(name)
                .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
            territory.dev_branch = Some(branch);
            (territory.clone(), territories.values().cloned().collect())
        };
        self.persist(snapshot_list)?;
        Ok(updated)
    }

    pub fn len(&self) -> usize {
        self.territories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.read().is_empty()
    }
}

#[cfg(test)]
#[path = "territories_tests.rs"]
mod tests;
