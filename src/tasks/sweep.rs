//! Expired-Sweep Task
//!
//! Background task that periodically removes expired and corrupt entries,
//! whether or not anything reads them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::cache::CacheStore;

// == Sweep Handle ==
/// Handle to a running sweep task.
///
/// Dropping the handle signals the task to stop without waiting for it.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Cancels the timer and waits for the task to exit. A sweep already in
    /// progress runs to completion first.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sweep task ended abnormally");
            }
        }
        info!("Sweep task stopped");
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Spawns a task that calls [`CacheStore::sweep_expired`] every `period`.
///
/// The first sweep happens one period after spawning; constructing the store
/// has already swept once. Each sweep runs on the blocking pool, since a
/// backend may do file I/O for every removal.
///
/// # Arguments
/// * `store` - Shared cache store to sweep
/// * `period` - Interval between sweeps
///
/// # Returns
/// A [`SweepHandle`] used to stop the task during shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::new(MemoryBackend::new(), CacheConfig::default())?);
/// let sweeper = spawn_sweep_task(store.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.stop().await;
/// ```
pub fn spawn_sweep_task<B>(store: Arc<CacheStore<B>>, period: Duration) -> SweepHandle
where
    B: Backend + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            prefix = %store.config().prefix,
            interval_ms = period.as_millis() as u64,
            "Starting expired-sweep task"
        );

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        debug!("Sweep task received shutdown signal");
                        return;
                    }
                }
            }

            // Sweep logs its own results
            let sweeping = store.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || sweeping.sweep_expired()).await {
                warn!(error = %e, "Expired-sweep panicked");
            }
        }
    });

    SweepHandle {
        shutdown_tx,
        task: Some(task),
    }
}
