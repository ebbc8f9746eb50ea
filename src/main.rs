//! Bounded TTL Cache - maintenance daemon
//!
//! Opens a file-backed cache namespace, keeps it swept on a fixed interval and
//! reports usage until shut down.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bounded_ttl_cache::{Config, FileBackend, TtlCache};

/// Main entry point for the cache maintenance daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file backend
/// 4. Start the cache (initial sweep + periodic sweep task)
/// 5. Wait for SIGINT/SIGTERM, then stop the sweep task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bounded_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache maintenance daemon");

    let config = Config::from_env();
    info!(
        "Configuration loaded: prefix={}, max_size_bytes={}, sweep_interval_ms={}, store={}",
        config.cache.prefix,
        config.cache.max_size_bytes,
        config.cache.sweep_interval_ms,
        config.store_path.display()
    );

    let mut backend = FileBackend::open(&config.store_path)
        .with_context(|| format!("opening store at {}", config.store_path.display()))?;
    if let Some(quota) = config.store_quota_bytes {
        backend = backend.with_quota(quota);
    }

    let cache = TtlCache::start(backend, config.cache.clone()).context("starting cache")?;
    info!(
        entries = cache.len(),
        usage_bytes = cache.usage_bytes(),
        low_water_bytes = cache.low_water_mark(),
        store = %cache.backend().path().display(),
        "Cache ready"
    );

    shutdown_signal().await?;

    let stats = serde_json::to_string(&cache.stats()).context("encoding stats")?;
    info!(%stats, "Final cache statistics");

    cache.stop().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("installing Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        }
        result = terminate => {
            result?;
            warn!("Received SIGTERM, initiating shutdown...");
        }
    }
    Ok(())
}
