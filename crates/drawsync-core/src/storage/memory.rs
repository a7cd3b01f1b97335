//! In-memory storage implementation.

use super::{SnapshotStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl SnapshotStore for MemoryStorage {
    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.write().map_err(lock_error)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<String> {
        let values = self.values.read().map_err(lock_error)?;
        values
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.write().map_err(lock_error)?;
        values.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let values = self.values.read().map_err(lock_error)?;
        Ok(values.contains_key(key))
    }
}
