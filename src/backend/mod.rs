//! Backend Module
//!
//! The flat, string-keyed persistent store the cache is layered on. The cache
//! only ever touches keys under its own prefix, so a backend may be shared
//! with unrelated data.

use std::collections::BTreeMap;

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

pub use crate::error::BackendError;

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// == Backend Trait ==
/// Synchronous key/value store contract.
///
/// Each call is atomic for its key. Nothing is assumed across keys.
pub trait Backend: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Stores `value` under `key`. On error the previous value is untouched.
    fn set(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Deletes `key`. Absent keys are not an error.
    fn remove(&self, key: &str) -> BackendResult<()>;

    /// Enumerates every raw key in the store, across all namespaces.
    fn keys(&self) -> BackendResult<Vec<String>>;
}

/// Bytes a key/value pair occupies against a quota.
pub(crate) fn footprint(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Checks that writing `value` under `key` keeps `entries` within `quota`.
/// An overwrite only counts the difference against the entry it replaces.
pub(crate) fn check_write_quota(
    entries: &BTreeMap<String, String>,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> BackendResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let current: usize = entries.iter().map(|(k, v)| footprint(k, v)).sum();
    let replaced = entries.get(key).map_or(0, |old| footprint(key, old));
    let required = current - replaced + footprint(key, value);
    if required > quota {
        return Err(BackendError::QuotaExceeded { required, quota });
    }
    Ok(())
}
