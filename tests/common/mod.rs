//! In-process fakes for the upstream adapters and the store.

#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use markfresh::{
    application::{
        freshness::{FreshnessCache, FreshnessPolicy},
        render::{RenderError, RenderRequest, RenderService, render_service},
        upstream::{ContentFetcher, MetadataProbe, RawDocument, UpstreamError, UpstreamMetadata},
    },
    cache::{CacheStats, CacheStore, CachedEntry, KeyTtl, MemoryStore, StoreError},
    domain::locator::ContentLocator,
};
use time::OffsetDateTime;

/// Probe whose answer can be changed between requests.
pub struct FakeProbe {
    answer: Mutex<Result<UpstreamMetadata, UpstreamError>>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn at(timestamp: OffsetDateTime) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(UpstreamMetadata {
                last_modified: timestamp,
            })),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: UpstreamError) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Err(error)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_timestamp(&self, timestamp: OffsetDateTime) {
        *self.answer.lock().expect("probe lock") = Ok(UpstreamMetadata {
            last_modified: timestamp,
        });
    }

    pub fn set_error(&self, error: UpstreamError) {
        *self.answer.lock().expect("probe lock") = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProbe for FakeProbe {
    async fn last_modified(
        &self,
        _locator: &ContentLocator,
    ) -> Result<UpstreamMetadata, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.lock().expect("probe lock").clone()
    }
}

/// Fetcher returning a configurable body, optionally after a delay.
pub struct FakeFetcher {
    answer: Mutex<Result<RawDocument, UpstreamError>>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn serving(body: &str, path: &str) -> Arc<Self> {
        Self::slow(body, path, Duration::ZERO)
    }

    pub fn slow(body: &str, path: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(RawDocument {
                body: body.to_string(),
                path: path.to_string(),
            })),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: UpstreamError) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Err(error)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_body(&self, body: &str, path: &str) {
        *self.answer.lock().expect("fetcher lock") = Ok(RawDocument {
            body: body.to_string(),
            path: path.to_string(),
        });
    }

    pub fn set_error(&self, error: UpstreamError) {
        *self.answer.lock().expect("fetcher lock") = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, _locator: &ContentLocator) -> Result<RawDocument, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.lock().expect("fetcher lock").clone()
    }
}

/// Store that reads as empty and rejects every write.
#[derive(Default)]
pub struct ReadOnlyStore {
    pub writes: AtomicUsize,
}

#[async_trait]
impl CacheStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<CachedEntry>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _entry: &CachedEntry, _ttl: Duration) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::unavailable("read-only replica"))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn scan(&self, _cursor: u64, _count: usize) -> Result<(u64, Vec<String>), StoreError> {
        Ok((0, Vec::new()))
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl, StoreError> {
        Ok(KeyTtl::Missing)
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        Err(StoreError::unavailable("read-only replica"))
    }
}

/// Memory store whose reads, or deletes of chosen keys, can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_reads: AtomicBool,
    undeletable: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn fail_reads(&self) {
        self.failing_reads.store(true, Ordering::SeqCst);
    }

    pub fn refuse_delete(&self, key: &str) {
        self.undeletable
            .lock()
            .expect("store lock")
            .insert(key.to_string());
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<CachedEntry>, StoreError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection reset"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, entry: &CachedEntry, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set(key, entry, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.undeletable.lock().expect("store lock").contains(key) {
            return Err(StoreError::unavailable("delete rejected"));
        }
        self.inner.delete(key).await
    }

    async fn scan(&self, cursor: u64, count: usize) -> Result<(u64, Vec<String>), StoreError> {
        self.inner.scan(cursor, count).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        self.inner.ttl(key).await
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        self.inner.stats().await
    }
}

/// The real renderer, counting how often it runs.
#[derive(Default)]
pub struct CountingRenderer {
    pub calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RenderService for CountingRenderer {
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        render_service().render(request)
    }
}

pub fn policy() -> FreshnessPolicy {
    FreshnessPolicy {
        ttl: Duration::from_secs(3600),
        request_deadline: Duration::from_secs(5),
        ..FreshnessPolicy::default()
    }
}

pub fn cache_with(
    store: Arc<dyn CacheStore>,
    probe: Arc<FakeProbe>,
    fetcher: Arc<FakeFetcher>,
    policy: FreshnessPolicy,
) -> FreshnessCache {
    FreshnessCache::new(store, probe, fetcher, render_service(), policy)
}

pub fn memory_cache(
    probe: Arc<FakeProbe>,
    fetcher: Arc<FakeFetcher>,
) -> (Arc<MemoryStore>, FreshnessCache) {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(store.clone(), probe, fetcher, policy());
    (store, cache)
}

pub fn counting_cache(
    probe: Arc<FakeProbe>,
    fetcher: Arc<FakeFetcher>,
) -> (Arc<MemoryStore>, Arc<CountingRenderer>, FreshnessCache) {
    let store = Arc::new(MemoryStore::new());
    let renderer = Arc::new(CountingRenderer::default());
    let cache = FreshnessCache::new(store.clone(), probe, fetcher, renderer.clone(), policy());
    (store, renderer, cache)
}
