//! Managed Cache Module
//!
//! Ties a [`CacheStore`] to its background sweep task: one value to open,
//! use, and stop.

use std::ops::Deref;
use std::sync::Arc;

use tracing::info;

use crate::backend::Backend;
use crate::cache::{CacheStore, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == TTL Cache ==
/// A cache store with its periodic sweep running.
///
/// Derefs to [`CacheStore`] for `put`/`get`/`remove`/`clear`/`keys`. Entries
/// live in the backend and outlast this value.
#[derive(Debug)]
pub struct TtlCache<B> {
    store: Arc<CacheStore<B>>,
    sweeper: SweepHandle,
}

impl<B: Backend + 'static> TtlCache<B> {
    /// Opens the namespace, sweeps it once, and starts the sweep timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(backend: B, config: CacheConfig) -> Result<Self> {
        Self::start_with_clock(backend, config, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        backend: B,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = Arc::new(CacheStore::with_clock(backend, config, clock)?);
        let sweeper = spawn_sweep_task(store.clone(), store.config().sweep_interval());

        info!(
            prefix = %store.config().prefix,
            max_size_bytes = store.config().max_size_bytes,
            "Cache started"
        );

        Ok(Self { store, sweeper })
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> &Arc<CacheStore<B>> {
        &self.store
    }

    /// Cancels the sweep timer, letting a running sweep finish.
    pub async fn stop(self) {
        self.sweeper.stop().await;
        info!(prefix = %self.store.config().prefix, "Cache stopped");
    }
}

impl<B> Deref for TtlCache<B> {
    type Target = CacheStore<B>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
