//! Process-local store backed by a concurrent map.
//!
//! Values go through the same JSON codec as Redis so both backends accept and
//! reject the same payloads. Expired keys read as missing but stay in the map
//! until deleted, which is what the reaper is for.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{
    entry::CachedEntry,
    store::{CacheStats, CacheStore, KeyTtl, StoreError},
};

#[derive(Debug, Clone)]
struct StoredValue {
    payload: String,
    expires_at: Option<Instant>,
    /// Write order; scan cursors point into it so deletes never shift a page.
    sequence: u64,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit expiry instant (`None` for no expiry), bypassing
    /// the TTL normally applied by [`CacheStore::set`].
    pub fn insert_with_expiry(
        &self,
        key: &str,
        entry: &CachedEntry,
        expires_at: Option<Instant>,
    ) -> Result<(), StoreError> {
        self.put(key, entry.encode()?, expires_at);
        Ok(())
    }

    /// Store a raw payload as-is, whether or not it decodes.
    pub fn insert_raw(&self, key: &str, payload: impl Into<String>, ttl: Duration) {
        self.put(key, payload.into(), Some(Instant::now() + ttl));
    }

    fn put(&self, key: &str, payload: String, expires_at: Option<Instant>) {
        // Sequences start at 1 so cursor 0 always means "from the start".
        let sequence = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.insert(
            key.to_string(),
            StoredValue {
                payload,
                expires_at,
                sequence,
            },
        );
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CachedEntry>, StoreError> {
        let payload = match self.entries.get(key) {
            Some(value) if !value.is_expired(Instant::now()) => value.payload.clone(),
            _ => return Ok(None),
        };
        CachedEntry::decode(&payload).map(Some)
    }

    async fn set(&self, key: &str, entry: &CachedEntry, ttl: Duration) -> Result<(), StoreError> {
        self.insert_with_expiry(key, entry, Some(Instant::now() + ttl))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn scan(&self, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StoreError> {
        let mut remaining: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|item| item.value().sequence >= cursor)
            .map(|item| (item.value().sequence, item.key().clone()))
            .collect();
        remaining.sort_unstable();

        let count = count.max(1);
        let next = remaining.get(count).map_or(0, |(sequence, _)| *sequence);
        remaining.truncate(count);

        Ok((next, remaining.into_iter().map(|(_, key)| key).collect()))
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let Some(value) = self.entries.get(key) else {
            return Ok(KeyTtl::Missing);
        };
        let now = Instant::now();
        Ok(match value.expires_at {
            None => KeyTtl::Persistent,
            Some(deadline) if deadline <= now => KeyTtl::Expired,
            Some(deadline) => KeyTtl::Remaining(deadline - now),
        })
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        let used_bytes: usize = self
            .entries
            .iter()
            .map(|item| item.key().len() + item.value().payload.len())
            .sum();

        let mut memory = BTreeMap::new();
        memory.insert("backend".to_string(), "memory".to_string());
        memory.insert("used_memory".to_string(), used_bytes.to_string());

        Ok(CacheStats {
            total_keys: self.entries.len() as u64,
            memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::RenderedDocument;
    use time::macros::datetime;

    fn entry(body: &str) -> CachedEntry {
        let document = RenderedDocument {
            html_body: body.to_string(),
            title: "repo".into(),
            author: "acme".into(),
            description: "d".into(),
            repository: "acme/repo".into(),
            last_updated: datetime!(2024-01-01 00:00 UTC),
        };
        CachedEntry::for_document(
            &document,
            datetime!(2024-01-01 00:00 UTC),
            datetime!(2024-01-02 00:00 UTC),
        )
        .expect("entry")
    }

    #[tokio::test]
    async fn get_distinguishes_missing_from_present() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.expect("get"), None);

        store
            .set("k", &entry("<p>a</p>"), Duration::from_secs(60))
            .await
            .expect("set");
        let found = store.get("k").await.expect("get").expect("present");
        assert_eq!(found.document().expect("doc").html_body, "<p>a</p>");
    }

    #[tokio::test]
    async fn expired_keys_read_as_missing_but_remain_listed() {
        let store = MemoryStore::new();
        store
            .insert_with_expiry("old", &entry("x"), Some(Instant::now()))
            .expect("insert");

        assert_eq!(store.get("old").await.expect("get"), None);
        assert_eq!(store.ttl("old").await.expect("ttl"), KeyTtl::Expired);
        assert_eq!(store.scan(0, 10).await.expect("scan").1, vec!["old"]);
    }

    #[tokio::test]
    async fn corrupt_payload_surfaces_as_codec_error() {
        let store = MemoryStore::new();
        store.insert_raw("bad", "{", Duration::from_secs(60));
        assert!(matches!(store.get("bad").await, Err(StoreError::Codec(_))));
    }

    #[tokio::test]
    async fn scan_pages_through_all_keys() {
        let store = MemoryStore::new();
        for key in ["a", "b", "c"] {
            store
                .set(key, &entry(key), Duration::from_secs(60))
                .await
                .expect("set");
        }

        let (cursor, first) = store.scan(0, 2).await.expect("scan");
        assert_eq!(first, vec!["a", "b"]);
        assert_ne!(cursor, 0);

        let (cursor, rest) = store.scan(cursor, 2).await.expect("scan");
        assert_eq!(rest, vec!["c"]);
        assert_eq!(cursor, 0);
    }

    #[tokio::test]
    async fn deletes_between_pages_do_not_skip_keys() {
        let store = MemoryStore::new();
        for key in ["a", "b", "c", "d"] {
            store
                .set(key, &entry(key), Duration::from_secs(60))
                .await
                .expect("set");
        }

        let (cursor, first) = store.scan(0, 2).await.expect("scan");
        assert_eq!(first, vec!["a", "b"]);
        for key in &first {
            store.delete(key).await.expect("delete");
        }

        let (cursor, rest) = store.scan(cursor, 2).await.expect("scan");
        assert_eq!(rest, vec!["c", "d"]);
        assert_eq!(cursor, 0);
    }

    #[tokio::test]
    async fn stats_report_key_count() {
        let store = MemoryStore::new();
        store
            .set("k", &entry("x"), Duration::from_secs(60))
            .await
            .expect("set");

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.total_keys, 1);
        assert_eq!(stats.memory.get("backend").map(String::as_str), Some("memory"));
    }
}
