//! Store adapter contract.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::entry::CachedEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },
    #[error("cache store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("cached value could not be (de)serialized: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Remaining(Duration),
    /// The expiry instant has passed but the key is still present.
    Expired,
    /// The key carries no expiry at all.
    Persistent,
    Missing,
}

impl KeyTtl {
    /// Interpret a Redis `TTL` reply (-2 missing, -1 no expiry).
    pub fn from_redis_seconds(seconds: i64) -> Self {
        match seconds {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            s if s <= 0 => KeyTtl::Expired,
            s => KeyTtl::Remaining(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Whether the reaper should delete a key in this state.
    pub fn is_lapsed(self) -> bool {
        matches!(self, KeyTtl::Expired | KeyTtl::Persistent)
    }
}

/// Read-only snapshot exposed to observability callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_keys: u64,
    pub memory: BTreeMap<String, String>,
}

/// Typed access to a TTL-capable key-value store.
///
/// `get` reports a missing or expired key as `Ok(None)`; errors are reserved
/// for transport and codec failures so callers can degrade on them.
/// Implementations must tolerate concurrent calls without external locking.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedEntry>, StoreError>;

    async fn set(&self, key: &str, entry: &CachedEntry, ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// One page of an incremental key scan. A returned cursor of `0` ends the scan.
    async fn scan(&self, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StoreError>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    async fn stats(&self) -> Result<CacheStats, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_ttl_replies_map_to_states() {
        assert_eq!(KeyTtl::from_redis_seconds(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_redis_seconds(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_redis_seconds(0), KeyTtl::Expired);
        assert_eq!(
            KeyTtl::from_redis_seconds(90),
            KeyTtl::Remaining(Duration::from_secs(90))
        );
    }

    #[test]
    fn only_expired_or_persistent_keys_are_lapsed() {
        assert!(KeyTtl::Expired.is_lapsed());
        assert!(KeyTtl::Persistent.is_lapsed());
        assert!(!KeyTtl::Missing.is_lapsed());
        assert!(!KeyTtl::Remaining(Duration::from_secs(1)).is_lapsed());
    }
}
