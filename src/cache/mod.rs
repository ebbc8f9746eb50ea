//! Cache Module
//!
//! Provides a namespaced key/value cache with TTL expiration, periodic
//! sweeping and size-bounded eviction over a persistent backend.

mod clock;
mod entry;
mod managed;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use managed::TtlCache;
pub use stats::CacheStats;
pub use store::CacheStore;
