// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent operation store, same shape as the job store.

use crate::error::StoreError;
use crate::snapshot;
use cosa_core::Operation;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct OperationStore {
    dir: PathBuf,
    operations: RwLock<HashMap<String, Operation>>,
}

impl OperationStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let loaded: Vec<Operation> = snapshot::load_dir(dir)?;
        let operations = loaded
            .into_iter()
            .map(|o| (o.id.as_str().to_string(), o))
            .collect();
        Ok(Self {
            dir: dir.to_owned(),
            operations: RwLock::new(operations),
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn insert(&self, operation: Operation) -> Result<(), StoreError> {
        let id = operation.id.as_str().to_string();
        {
            let mut operations = self.operations.write();
            if operations.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            operations.insert(id.clone(), operation.clone());
        }
        snapshot::write_json_atomic(&self.path_for(&id), &operation)
    }

    pub fn get(&self, id: &str) -> Option<Operation> {
        self.operations.read().get(id).cloned()
    }

    pub fn update<F>(&self, id: &str, f: F) -> Result<Operation, StoreError>
    where
        F: FnOnce(&mut Operation),
    {
        let updated = {
            let mut operations = self.operations.write();
            let operation = operations
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            f(operation);
            operation.clone()
        };
        snapshot::write_json_atomic(&self.path_for(id), &updated)?;
        Ok(updated)
    }

    pub fn list(&self) -> Vec<Operation> {
        let mut operations: Vec<Operation> =
            self.operations.read().values().cloned().collect();
        operations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        operations
    }

    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }
}

#[cfg(test)]
#[path = "operations_tests.rs"]
mod tests;
