//! In-memory Backend
//!
//! A process-local map with an optional byte quota. Used by tests and by
//! callers that want cache semantics without persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{check_write_quota, footprint, Backend, BackendResult};

// == Memory Backend ==
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose total footprint may not exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total footprint of every key in the store.
    pub fn total_bytes(&self) -> usize {
        self.read().iter().map(|(k, v)| footprint(k, v)).sum()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A poisoned lock still holds a consistent map: every mutation is a
    // single insert or remove.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        let mut entries = self.write();

        check_write_quota(&entries, key, value, self.quota_bytes)?;

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> BackendResult<()> {
        self.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        Ok(self.read().keys().cloned().collect())
    }
}
