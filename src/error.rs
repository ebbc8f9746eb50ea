//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Backend Error Enum ==
/// Failures reported by a persistent key/value backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The write would push the store past its byte quota
    #[error("Quota exceeded: {required} bytes required, quota is {quota} bytes")]
    QuotaExceeded { required: usize, quota: usize },

    /// Underlying file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk store could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Persistent write failed even after the cleanup-and-retry sequence
    #[error("Failed to write key '{key}': {source}")]
    StoreWrite {
        key: String,
        #[source]
        source: BackendError,
    },

    /// The value could not be encoded; nothing was written
    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    /// Configuration rejected at construction time
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
