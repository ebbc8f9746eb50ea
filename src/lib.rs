//! Bounded TTL Cache - a namespaced key/value cache over a persistent store
//!
//! Provides TTL expiration, periodic background sweeping and size-bounded
//! oldest-first eviction.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use backend::{Backend, FileBackend, MemoryBackend};
pub use cache::{CacheEntry, CacheStats, CacheStore, TtlCache};
pub use config::{CacheConfig, Config};
pub use error::{BackendError, CacheError, Result};
pub use tasks::spawn_sweep_task;
