//! Configuration Module
//!
//! Cache policy is fixed at construction. The daemon settings wrap it and are
//! loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default namespace prefix
pub const DEFAULT_PREFIX: &str = "app_";
/// Default size ceiling: 5 MiB
pub const DEFAULT_MAX_SIZE_BYTES: usize = 5 * 1024 * 1024;
/// Default expiry: 7 days
pub const DEFAULT_EXPIRY_MS: u64 = 7 * 24 * 60 * 60 * 1000;
/// Default sweep interval: 24 hours
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

// == Cache Config ==
/// Process-lifetime cache policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Prefix prepended to every logical key; defines the namespace
    pub prefix: String,
    /// Ceiling on the namespace footprint (raw key + raw value bytes)
    pub max_size_bytes: usize,
    /// TTL applied by `put_with_default_expiry`
    pub default_expiry_ms: u64,
    /// Interval between background sweeps
    pub sweep_interval_ms: u64,
}

impl CacheConfig {
    /// Creates a config with the given prefix and default limits.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Rejects configurations the cache cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(CacheError::InvalidConfig(
                "prefix must not be empty".to_string(),
            ));
        }
        if self.max_size_bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size_bytes must be positive".to_string(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "sweep_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_expiry(&self) -> Duration {
        Duration::from_millis(self.default_expiry_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            default_expiry_ms: DEFAULT_EXPIRY_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

// == Daemon Config ==
/// Settings for the maintenance daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache policy
    pub cache: CacheConfig,
    /// Path of the JSON file backing the store
    pub store_path: PathBuf,
    /// Optional byte quota for the whole store file
    pub store_quota_bytes: Option<usize>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Namespace prefix (default: `app_`)
    /// - `CACHE_MAX_SIZE_BYTES` - Namespace size ceiling (default: 5 MiB)
    /// - `CACHE_DEFAULT_EXPIRY_MS` - Default TTL (default: 7 days)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep frequency (default: 24 hours)
    /// - `CACHE_STORE_PATH` - Store file (default: `cache_store.json`)
    /// - `CACHE_STORE_QUOTA_BYTES` - Store quota (default: unlimited)
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        Self {
            cache: CacheConfig {
                prefix: env::var("CACHE_PREFIX")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or(defaults.prefix),
                max_size_bytes: parse_positive("CACHE_MAX_SIZE_BYTES")
                    .unwrap_or(defaults.max_size_bytes),
                default_expiry_ms: env::var("CACHE_DEFAULT_EXPIRY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.default_expiry_ms),
                sweep_interval_ms: parse_positive("CACHE_SWEEP_INTERVAL_MS")
                    .unwrap_or(defaults.sweep_interval_ms),
            },
            store_path: env::var("CACHE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cache_store.json")),
            store_quota_bytes: parse_positive("CACHE_STORE_QUOTA_BYTES"),
        }
    }
}

/// Zero falls back to the default just like an unset variable.
fn parse_positive<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .filter(|v| *v != T::default())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            store_path: PathBuf::from("cache_store.json"),
            store_quota_bytes: None,
        }
    }
}
