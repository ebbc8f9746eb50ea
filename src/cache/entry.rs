//! Cache Entry Module
//!
//! Defines the persisted record for a single cache entry and its JSON wire
//! format: `{"value": ..., "expiry": <ms>, "timestamp": <ms>}`, with `expiry`
//! omitted when the entry has no TTL.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A stored value together with its write time and optional expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Absolute expiry (Unix milliseconds), None = no TTL
    #[serde(rename = "expiry", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Write timestamp (Unix milliseconds)
    #[serde(rename = "timestamp")]
    pub written_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry written at `now_ms`, expiring `ttl_ms` later if given.
    pub fn new(value: V, now_ms: u64, ttl_ms: Option<u64>) -> Self {
        Self {
            value,
            expires_at: ttl_ms.map(|ttl| now_ms.saturating_add(ttl)),
            written_at: now_ms,
        }
    }

    // == Is Expired ==
    /// An entry is expired strictly after its expiry instant; at the instant
    /// itself it is still live.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms > expires)
    }

    // == Time To Live ==
    /// Remaining TTL in milliseconds, `Some(0)` once elapsed, None without TTL.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now_ms))
    }

    /// Write time as a UTC datetime, for display.
    pub fn written_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.written_at as i64).single()
    }
}

impl<V: Serialize> CacheEntry<V> {
    /// Serializes the entry to its wire form.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<V: DeserializeOwned> CacheEntry<V> {
    /// Parses the wire form. Any failure marks the raw value as corrupt.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

// == Entry Meta ==
/// Header-only view of a stored entry. The payload must be present but is
/// skipped rather than materialized.
pub(crate) type EntryMeta = CacheEntry<IgnoredAny>;

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("test_value".to_string(), 1_000, None);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.written_at, 1_000);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new("test_value".to_string(), 1_000, Some(500));

        assert_eq!(entry.expires_at, Some(1_500));
        assert!(!entry.is_expired_at(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(1u8, 1_000, Some(0));

        // Live at the expiry instant, expired one millisecond after
        assert!(!entry.is_expired_at(1_000));
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new((), 1_000, Some(10_000));

        assert_eq!(entry.ttl_remaining_ms(4_000), Some(7_000));
        assert_eq!(entry.ttl_remaining_ms(20_000), Some(0));
        assert!(CacheEntry::new((), 1_000, None).ttl_remaining_ms(0).is_none());
    }

    #[test]
    fn test_wire_format_omits_missing_expiry() {
        let entry = CacheEntry::new("v".to_string(), 42, None);
        assert_eq!(entry.encode().unwrap(), r#"{"value":"v","timestamp":42}"#);

        let entry = CacheEntry::new("v".to_string(), 42, Some(8));
        assert_eq!(
            entry.encode().unwrap(),
            r#"{"value":"v","expiry":50,"timestamp":42}"#
        );
    }

    #[test]
    fn test_decode_roundtrip_preserves_fields() {
        let entry = CacheEntry::new(vec![1, 2, 3], 7, Some(3));
        let decoded: CacheEntry<Vec<i32>> = CacheEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_rejects_malformed_records() {
        assert!(CacheEntry::<String>::decode("not json").is_err());
        assert!(CacheEntry::<String>::decode(r#"{"value":"v"}"#).is_err());
        assert!(EntryMeta::decode(r#"{"timestamp":1}"#).is_err());
        assert!(CacheEntry::<u32>::decode(r#"{"value":"v","timestamp":1}"#).is_err());
    }

    #[test]
    fn test_meta_skips_payload() {
        let meta = EntryMeta::decode(r#"{"value":{"nested":[1,2]},"expiry":9,"timestamp":4}"#)
            .unwrap();
        assert_eq!(meta.written_at, 4);
        assert_eq!(meta.expires_at, Some(9));
    }

    #[test]
    fn test_written_at_utc() {
        let entry = CacheEntry::new((), 0, None);
        assert_eq!(entry.written_at_utc().unwrap().timestamp(), 0);
    }
}
