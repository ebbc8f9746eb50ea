//! Integration Tests for the Managed Cache
//!
//! Exercises the full lifecycle against real backends: start, read/write,
//! background sweeping, stop, and reopening the same namespace.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bounded_ttl_cache::backend::BackendResult;
use bounded_ttl_cache::cache::ManualClock;
use bounded_ttl_cache::{
    Backend, BackendError, CacheConfig, CacheError, CacheStore, FileBackend, MemoryBackend,
    TtlCache,
};
use tempfile::tempdir;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

fn config(prefix: &str) -> CacheConfig {
    CacheConfig {
        prefix: prefix.to_string(),
        max_size_bytes: 4_096,
        default_expiry_ms: 60_000,
        sweep_interval_ms: 1_000,
    }
}

/// Backend whose reads, writes and enumeration all fail. Counts write attempts.
#[derive(Default)]
struct FlakyBackend {
    set_calls: AtomicUsize,
}

impl Backend for FlakyBackend {
    fn get(&self, _key: &str) -> BackendResult<Option<String>> {
        Err(BackendError::Io(std::io::Error::other("read failed")))
    }

    fn set(&self, _key: &str, _value: &str) -> BackendResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Io(std::io::Error::other("write failed")))
    }

    fn remove(&self, _key: &str) -> BackendResult<()> {
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        Err(BackendError::Io(std::io::Error::other("enumerate failed")))
    }
}

// == Lifecycle ==

#[tokio::test(start_paused = true)]
async fn test_entries_outlive_cache_instance() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let cache = TtlCache::start(FileBackend::open(&path).unwrap(), config("app_")).unwrap();
    assert_ok!(cache.put("session", "token-123", None));
    assert_ok!(cache.put("profile", &vec!["a", "b"], Some(Duration::from_secs(3_600))));
    cache.stop().await;

    let reopened = TtlCache::start(FileBackend::open(&path).unwrap(), config("app_")).unwrap();
    assert_eq!(
        reopened.get::<String>("session"),
        Some("token-123".to_string())
    );
    assert_eq!(
        reopened.get::<Vec<String>>("profile"),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    reopened.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_next_instance_reaps_expired_leftovers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let clock = ManualClock::new(1_000_000);

    let cache = TtlCache::start_with_clock(
        FileBackend::open(&path).unwrap(),
        config("app_"),
        Arc::new(clock.clone()),
    )
    .unwrap();
    assert_ok!(cache.put("short", "v", Some(Duration::from_millis(10))));
    assert_ok!(cache.put("long", "v", None));
    cache.stop().await;

    clock.advance(Duration::from_millis(11));
    let reopened = TtlCache::start_with_clock(
        FileBackend::open(&path).unwrap(),
        config("app_"),
        Arc::new(clock.clone()),
    )
    .unwrap();

    assert_eq!(reopened.keys(), vec!["long"]);
    assert_eq!(reopened.stats().expired_removed, 1);
    reopened.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_without_reads() {
    let clock = ManualClock::new(1_000_000);
    let cache = TtlCache::start_with_clock(
        MemoryBackend::new(),
        config("app_"),
        Arc::new(clock.clone()),
    )
    .unwrap();

    for i in 0..5 {
        assert_ok!(cache.put(&format!("temp{}", i), &i, Some(Duration::from_millis(100))));
    }
    assert_ok!(cache.put("keep", &42, None));
    clock.advance(Duration::from_millis(101));

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    // Reaped by the timer, not by reads
    assert_eq!(cache.backend().len(), 1);
    assert_eq!(cache.stats().expired_removed, 5);
    assert_eq!(cache.stats().misses, 0);
    cache.stop().await;
}

// == Namespacing ==

#[test]
fn test_namespaces_share_backend_independently() {
    let backend = Arc::new(MemoryBackend::new());

    let users = CacheStore::new(SharedBackend(backend.clone()), config("users_")).unwrap();
    let posts = CacheStore::new(SharedBackend(backend.clone()), config("posts_")).unwrap();

    assert_ok!(users.put("1", "alice", None));
    assert_ok!(posts.put("1", "hello world", None));
    assert_ok!(posts.put("2", "second", None));

    users.clear();
    assert_eq!(users.get::<String>("1"), None);
    assert_eq!(posts.get::<String>("1"), Some("hello world".to_string()));

    let keys: HashSet<String> = posts.keys().into_iter().collect();
    let expected: HashSet<String> = ["1", "2"].iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, expected);
    assert_eq!(backend.len(), 2);
}

/// Lets several stores share one backend.
struct SharedBackend(Arc<MemoryBackend>);

impl Backend for SharedBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> BackendResult<()> {
        self.0.remove(key)
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        self.0.keys()
    }
}

// == Size Bounds ==

/// File store with a 1000 byte quota holding five 188-byte entries.
fn filled_file_cache(
    dir: &tempfile::TempDir,
    max_size_bytes: usize,
) -> (TtlCache<FileBackend>, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let backend = FileBackend::open(dir.path().join("store.json"))
        .unwrap()
        .with_quota(1_000);
    let cache = TtlCache::start_with_clock(
        backend,
        CacheConfig {
            max_size_bytes,
            ..config("app_")
        },
        Arc::new(clock.clone()),
    )
    .unwrap();

    for i in 0..5 {
        assert_ok!(cache.put(&format!("k{}", i), &"x".repeat(150), None));
        clock.advance(Duration::from_millis(1));
    }
    assert_eq!(cache.usage_bytes(), 940);
    (cache, clock)
}

#[tokio::test(start_paused = true)]
async fn test_quota_failure_forces_eviction_then_retries() {
    let dir = tempdir().unwrap();
    let (cache, _) = filled_file_cache(&dir, 1_000);

    // 940 + 139 exceeds the quota; forced eviction drops k0 to reach 800
    assert_ok!(cache.put("big", &"y".repeat(100), None));

    assert_eq!(cache.get::<String>("k0"), None);
    assert_eq!(cache.get::<String>("big"), Some("y".repeat(100)));
    let stats = cache.stats();
    assert_eq!(stats.write_retries, 1);
    assert_eq!(stats.evictions, 1);
    cache.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_quota_failure_without_headroom_is_reported() {
    let dir = tempdir().unwrap();
    let (cache, _) = filled_file_cache(&dir, 10_000);

    // Usage is already under 80% of the ceiling, so forced eviction frees
    // nothing and the retry fails too
    let result = cache.put("big", &"y".repeat(400), None);
    assert!(matches!(result, Err(CacheError::StoreWrite { .. })));
    assert_eq!(cache.get::<String>("big"), None);
    assert_eq!(cache.len(), 5);
    cache.stop().await;
}

// == Backend Failures ==

#[tokio::test]
async fn test_read_failures_degrade_to_empty() {
    let store = CacheStore::new(FlakyBackend::default(), config("app_")).unwrap();

    assert_eq!(store.get::<String>("anything"), None);
    assert!(store.keys().is_empty());
    assert_eq!(store.sweep_expired(), 0);
    assert_eq!(store.usage_bytes(), 0);
    store.remove("anything");
    store.clear();
}

#[tokio::test]
async fn test_write_failure_surfaces_after_one_retry() {
    let store = CacheStore::new(FlakyBackend::default(), config("app_")).unwrap();

    let err = assert_err!(store.put("k", "v", None));
    assert!(matches!(
        err,
        CacheError::StoreWrite {
            source: BackendError::Io(_),
            ..
        }
    ));
    assert_eq!(store.stats().write_failures, 1);
    // First attempt plus exactly one retry
    assert_eq!(store.backend().set_calls.load(Ordering::SeqCst), 2);
}
