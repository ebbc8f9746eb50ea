//! Cache Store Module
//!
//! Main cache engine: namespaced entries on top of a flat backend, with lazy
//! TTL reaping on read, full expired-sweeps, and size enforcement that evicts
//! oldest-written entries down to a low-water mark.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::{footprint, Backend};
use crate::cache::entry::EntryMeta;
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Bounded TTL cache over a persistent backend.
///
/// Every operation runs to completion on the caller's thread. Mutations
/// (`put`, `remove`, `clear`, sweeps and eviction) are serialized through an
/// internal lock, so a sweep can never delete an entry written after it
/// decided the old one was stale. Reads take the lock only to reap.
pub struct CacheStore<B> {
    /// Persistent key/value store
    backend: B,
    /// Immutable policy
    config: CacheConfig,
    /// Time source for write stamps and expiry checks
    clock: Arc<dyn Clock>,
    /// Performance statistics
    stats: StatsRecorder,
    /// Held for every read-decide-delete sequence
    write_lock: Mutex<()>,
}

impl<B: Backend> CacheStore<B> {
    // == Constructor ==
    /// Creates a store on the system clock and sweeps expired entries left
    /// behind by earlier instances using the same prefix.
    pub fn new(backend: B, config: CacheConfig) -> Result<Self> {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Same as [`CacheStore::new`] with an explicit time source.
    pub fn with_clock(backend: B, config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let store = Self {
            backend,
            config,
            clock,
            stats: StatsRecorder::default(),
            write_lock: Mutex::new(()),
        };
        store.sweep_expired();
        Ok(store)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // == Put ==
    /// Stores `value` under `key`, expiring `ttl` after now if given.
    ///
    /// A failed write triggers an expired-sweep and a forced eviction down to
    /// the low-water mark, then exactly one retry. If that also fails the
    /// error is returned and the new entry is not stored.
    ///
    /// # Arguments
    /// * `key` - Logical key; stored under `prefix + key`
    /// * `value` - Any serializable value
    /// * `ttl` - Optional time-to-live; `None` never expires by TTL
    pub fn put<V>(&self, key: &str, value: &V, ttl: Option<Duration>) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let now = self.clock.now_ms();
        let ttl_ms = ttl.map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        let encoded = CacheEntry::new(value, now, ttl_ms).encode()?;
        let raw_key = self.raw_key(key);
        let _guard = self.lock();

        let first = match self.backend.set(&raw_key, &encoded) {
            Ok(()) => {
                self.enforce_size_locked(false);
                return Ok(());
            }
            Err(e) => e,
        };

        warn!(key, error = %first, "Write failed, reclaiming space before retry");
        self.sweep_expired_locked();
        self.enforce_size_locked(true);

        match self.backend.set(&raw_key, &encoded) {
            Ok(()) => {
                self.stats.record_write_retry();
                Ok(())
            }
            Err(source) => {
                self.stats.record_write_failure();
                error!(key, error = %source, "Write failed after cleanup");
                Err(CacheError::StoreWrite {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    /// Stores `value` with the configured default expiry.
    pub fn put_with_default_expiry<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        self.put(key, value, Some(self.config.default_expiry()))
    }

    // == Get ==
    /// Returns the value under `key` if present, decodable and unexpired.
    ///
    /// Expired and corrupt entries are deleted on the way out.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Like [`CacheStore::get`], returning the write and expiry stamps too.
    pub fn get_entry<V: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<V>> {
        let raw_key = self.raw_key(key);
        let Some(raw) = self.read_raw(&raw_key) else {
            self.stats.record_miss();
            return None;
        };

        let now = self.clock.now_ms();
        match CacheEntry::<V>::decode(&raw) {
            Ok(entry) if !entry.is_expired_at(now) => {
                debug!(key, ttl_remaining_ms = ?entry.ttl_remaining_ms(now), "Cache hit");
                self.stats.record_hit();
                Some(entry)
            }
            Ok(_) => {
                debug!(key, "Removing expired entry on read");
                if self.delete_if_unchanged(&raw_key, &raw) {
                    self.stats.record_expired();
                }
                self.stats.record_miss();
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Removing corrupt entry on read");
                if self.delete_if_unchanged(&raw_key, &raw) {
                    self.stats.record_corrupt();
                }
                self.stats.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Deletes `key`. Absent keys are ignored.
    pub fn remove(&self, key: &str) {
        let _guard = self.lock();
        self.delete_raw(&self.raw_key(key));
    }

    // == Clear ==
    /// Deletes every entry in the namespace and nothing outside it.
    pub fn clear(&self) {
        let _guard = self.lock();
        let raw_keys = self.namespaced_keys();
        let count = raw_keys.len();
        for raw_key in raw_keys {
            self.delete_raw(&raw_key);
        }
        debug!(prefix = %self.config.prefix, count, "Cleared namespace");
    }

    // == Keys ==
    /// Logical keys currently in the namespace, live or not, in backend
    /// enumeration order.
    pub fn keys(&self) -> Vec<String> {
        let prefix_len = self.config.prefix.len();
        self.namespaced_keys()
            .into_iter()
            .map(|raw_key| raw_key[prefix_len..].to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.namespaced_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Sweep Expired ==
    /// Removes every expired or corrupt entry in the namespace.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let _guard = self.lock();
        self.sweep_expired_locked()
    }

    fn sweep_expired_locked(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for raw_key in self.namespaced_keys() {
            let Some(raw) = self.read_raw(&raw_key) else {
                continue;
            };
            let corrupt = match EntryMeta::decode(&raw) {
                Ok(meta) if !meta.is_expired_at(now) => continue,
                Ok(_) => false,
                Err(_) => true,
            };

            if self.delete_raw(&raw_key) {
                if corrupt {
                    self.stats.record_corrupt();
                } else {
                    self.stats.record_expired();
                }
                removed += 1;
            }
        }

        self.stats.record_sweep();
        if removed > 0 {
            info!(prefix = %self.config.prefix, removed, "Expired-sweep removed entries");
        } else {
            debug!(prefix = %self.config.prefix, "Expired-sweep found nothing to remove");
        }
        removed
    }

    // == Enforce Size ==
    /// Evicts oldest-written entries until usage is at or below the low-water
    /// mark. Unless `forced`, does nothing while usage is within the ceiling.
    ///
    /// Corrupt entries count as written at time zero and go first.
    ///
    /// # Arguments
    /// * `forced` - Evict down to the low-water mark even when usage is
    ///   within the ceiling
    ///
    /// # Returns
    /// The number of entries evicted.
    pub fn enforce_size(&self, forced: bool) -> usize {
        let _guard = self.lock();
        self.enforce_size_locked(forced)
    }

    fn enforce_size_locked(&self, forced: bool) -> usize {
        let mut usage = 0;
        let mut candidates = Vec::new();

        for raw_key in self.namespaced_keys() {
            let Some(raw) = self.read_raw(&raw_key) else {
                continue;
            };
            let size = footprint(&raw_key, &raw);
            let meta = EntryMeta::decode(&raw)
                .unwrap_or_else(|_| CacheEntry::new(IgnoredAny, 0, None));
            usage += size;
            candidates.push((raw_key, size, meta));
        }

        if usage <= self.config.max_size_bytes && !forced {
            return 0;
        }

        // Stable: equal timestamps keep enumeration order
        candidates.sort_by_key(|(_, _, meta)| meta.written_at);

        let low_water = self.low_water_mark();
        let mut evicted = 0;
        for (raw_key, size, meta) in candidates {
            if usage <= low_water {
                break;
            }
            if self.delete_raw(&raw_key) {
                usage -= size;
                evicted += 1;
                self.stats.record_eviction();
                debug!(
                    key = %raw_key,
                    written_at = ?meta.written_at_utc(),
                    size,
                    "Evicted entry"
                );
            }
        }

        info!(
            prefix = %self.config.prefix,
            evicted,
            usage_bytes = usage,
            forced,
            "Size enforcement complete"
        );
        evicted
    }

    // == Usage ==
    /// Bytes held by the namespace: raw key plus raw value, summed.
    pub fn usage_bytes(&self) -> usize {
        self.namespaced_keys()
            .iter()
            .filter_map(|raw_key| self.read_raw(raw_key).map(|raw| footprint(raw_key, &raw)))
            .sum()
    }

    /// 80% of the ceiling, rounded down. Usage is an integer, so comparing
    /// against the floor is exact.
    pub fn low_water_mark(&self) -> usize {
        let max = self.config.max_size_bytes;
        max / 5 * 4 + max % 5 * 4 / 5
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Helpers ==
    // Poisoning only means a panic mid-mutation; the backend is still the
    // source of truth.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deletes `raw_key` only if it still holds `seen`, so a write that
    /// landed after the caller's read survives.
    fn delete_if_unchanged(&self, raw_key: &str, seen: &str) -> bool {
        let _guard = self.lock();
        match self.read_raw(raw_key) {
            Some(current) if current == seen => self.delete_raw(raw_key),
            _ => false,
        }
    }

    fn raw_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    fn namespaced_keys(&self) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.config.prefix))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to enumerate backend keys");
                Vec::new()
            }
        }
    }

    /// Backend read failures read as absent.
    fn read_raw(&self, raw_key: &str) -> Option<String> {
        self.backend.get(raw_key).unwrap_or_else(|e| {
            warn!(key = %raw_key, error = %e, "Backend read failed");
            None
        })
    }

    /// Returns false if the backend refused the delete.
    fn delete_raw(&self, raw_key: &str) -> bool {
        match self.backend.remove(raw_key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %raw_key, error = %e, "Backend remove failed");
                false
            }
        }
    }
}

impl<B> std::fmt::Debug for CacheStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
