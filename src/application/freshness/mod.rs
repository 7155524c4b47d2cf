//! Freshness cache orchestrator.
//!
//! Every request walks `lookup -> probe -> (fresh | stale | miss)`. A cached
//! entry is only trusted while the upstream revision timestamp is not newer
//! than the one stored with it. When the probe or a refresh fails, a cached
//! entry is served instead of an error; without one the failure propagates.
//!
//! Concurrent requests for one key share a single resolution unless
//! coalescing is disabled. Each request runs under a deadline; once it
//! passes, in-flight calls are dropped and nothing is written.

mod error;
mod inflight;
mod outcome;

use std::{future::Future, sync::Arc, time::Duration};

use futures::FutureExt;
use metrics::{counter, histogram};
use time::OffsetDateTime;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::{
    application::{
        render::{RenderContext, RenderRequest, RenderService, normalize_markdown},
        upstream::{ContentFetcher, MetadataProbe, UpstreamError},
    },
    cache::{CacheStats, CacheStore, CachedEntry},
    domain::{document::RenderedDocument, locator::ContentLocator},
};

pub use error::FreshnessError;
pub use outcome::{CacheWrite, FetchOutcome, ServeSource};

use inflight::InFlightRefreshes;

const METRIC_CACHE_HIT: &str = "markfresh_cache_hit_total";
const METRIC_CACHE_MISS: &str = "markfresh_cache_miss_total";
const METRIC_CACHE_STALE: &str = "markfresh_cache_stale_total";
const METRIC_CACHE_DEGRADED: &str = "markfresh_cache_degraded_total";
const METRIC_CACHE_FALLBACK: &str = "markfresh_cache_fallback_total";
const METRIC_CACHE_WRITE_FAILED: &str = "markfresh_cache_write_failed_total";
const METRIC_RENDER_MS: &str = "markfresh_render_duration_ms";

const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(30);
const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Expiry handed to the store with every write.
    pub ttl: Duration,
    /// Budget for one request, covering store, probe, fetch and render.
    pub request_deadline: Duration,
    /// Share one resolution between concurrent requests for a key.
    pub coalesce: bool,
    /// Host that relative asset references are rewritten against.
    pub raw_base_url: String,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            request_deadline: DEFAULT_REQUEST_DEADLINE,
            coalesce: true,
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
        }
    }
}

/// Entry point for callers: `render_or_fetch`, `invalidate` and `stats`.
#[derive(Clone)]
pub struct FreshnessCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn CacheStore>,
    probe: Arc<dyn MetadataProbe>,
    fetcher: Arc<dyn ContentFetcher>,
    renderer: Arc<dyn RenderService>,
    policy: FreshnessPolicy,
    inflight: InFlightRefreshes,
}

/// The request deadline passed while waiting on a dependency.
struct Expired;

async fn within<F: Future>(deadline: Instant, work: F) -> Result<F::Output, Expired> {
    timeout_at(deadline, work).await.map_err(|_| Expired)
}

impl FreshnessCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        probe: Arc<dyn MetadataProbe>,
        fetcher: Arc<dyn ContentFetcher>,
        renderer: Arc<dyn RenderService>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                probe,
                fetcher,
                renderer,
                policy,
                inflight: InFlightRefreshes::new(),
            }),
        }
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.inner.policy
    }

    /// Parse a GitHub URL and serve its rendered document.
    pub async fn render_or_fetch_url(&self, url: &str) -> Result<FetchOutcome, FreshnessError> {
        let locator = ContentLocator::parse(url)?;
        self.render_or_fetch(&locator).await
    }

    pub async fn render_or_fetch(
        &self,
        locator: &ContentLocator,
    ) -> Result<FetchOutcome, FreshnessError> {
        let deadline = Instant::now() + self.inner.policy.request_deadline;

        if !self.inner.policy.coalesce {
            return self.inner.resolve(locator, deadline).await;
        }

        let key = locator.cache_key();
        let inner = Arc::clone(&self.inner);
        let owned = locator.clone();
        let (resolution, started) = self.inner.inflight.join_or_start(&key, deadline, move || {
            async move { inner.resolve(&owned, deadline).await }.boxed()
        });
        if !started {
            debug!(key = %key, "Joined in-flight resolution");
        }

        within(deadline, resolution)
            .await
            .map_err(|Expired| self.inner.expired())?
    }

    /// Delete the cache entry for a cache key or a GitHub URL. Returns the
    /// key that was removed.
    pub async fn invalidate(&self, key_or_url: &str) -> Result<String, FreshnessError> {
        let key = match ContentLocator::parse(key_or_url) {
            Ok(locator) => locator.cache_key(),
            Err(_) => key_or_url.trim().to_string(),
        };
        if key.is_empty() {
            return Err(FreshnessError::InvalidLocator(
                "cache key must not be empty".to_string(),
            ));
        }

        timeout(self.inner.policy.request_deadline, self.inner.store.delete(&key))
            .await
            .map_err(|_| self.inner.expired())??;
        info!(key = %key, "Invalidated cache entry");
        Ok(key)
    }

    pub async fn stats(&self) -> Result<CacheStats, FreshnessError> {
        let stats = timeout(self.inner.policy.request_deadline, self.inner.store.stats())
            .await
            .map_err(|_| self.inner.expired())??;
        Ok(stats)
    }
}

impl Inner {
    fn expired(&self) -> FreshnessError {
        FreshnessError::deadline_exceeded(self.policy.request_deadline)
    }

    async fn resolve(
        &self,
        locator: &ContentLocator,
        deadline: Instant,
    ) -> Result<FetchOutcome, FreshnessError> {
        let key = locator.cache_key();

        let cached = self
            .lookup(&key, deadline)
            .await
            .map_err(|Expired| self.expired())?;
        let Some((entry, cached_document)) = cached else {
            counter!(METRIC_CACHE_MISS).increment(1);
            return self.resolve_miss(locator, &key, deadline).await;
        };

        let probed = within(deadline, self.probe.last_modified(locator))
            .await
            .map_err(|Expired| self.expired())?;
        let metadata = match probed {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(key = %key, error = %err, "Probe failed; serving cached entry unverified");
                counter!(METRIC_CACHE_DEGRADED).increment(1);
                return Ok(FetchOutcome::cached(
                    cached_document,
                    ServeSource::Degraded {
                        reason: err.to_string(),
                    },
                ));
            }
        };

        if metadata.last_modified <= entry.raw_metadata_timestamp {
            counter!(METRIC_CACHE_HIT).increment(1);
            debug!(key = %key, "Cache entry is current");
            return Ok(FetchOutcome::cached(cached_document, ServeSource::Fresh));
        }

        counter!(METRIC_CACHE_STALE).increment(1);
        info!(
            key = %key,
            cached = %entry.raw_metadata_timestamp,
            upstream = %metadata.last_modified,
            "Cache entry is stale; refreshing"
        );

        let rendered = self
            .render_upstream(locator, metadata.last_modified, deadline)
            .await
            .map_err(|Expired| self.expired())?;
        match rendered {
            Ok(document) => {
                let cache_write = self
                    .write(&key, &document, metadata.last_modified, true, deadline)
                    .await
                    .map_err(|Expired| self.expired())?;
                Ok(FetchOutcome {
                    document,
                    source: ServeSource::Refreshed,
                    cache_write,
                })
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Refresh failed; serving previous cache entry");
                counter!(METRIC_CACHE_FALLBACK).increment(1);
                Ok(FetchOutcome::cached(
                    cached_document,
                    ServeSource::Fallback {
                        reason: err.to_string(),
                    },
                ))
            }
        }
    }

    async fn resolve_miss(
        &self,
        locator: &ContentLocator,
        key: &str,
        deadline: Instant,
    ) -> Result<FetchOutcome, FreshnessError> {
        let probed = within(deadline, self.probe.last_modified(locator))
            .await
            .map_err(|Expired| self.expired())?;
        let revision = match probed {
            Ok(metadata) => Some(metadata.last_modified),
            Err(err @ (UpstreamError::Unauthorized { .. } | UpstreamError::Timeout)) => {
                return Err(err.into());
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Probe failed on a miss; serving without freshness metadata");
                None
            }
        };

        let last_updated = revision.unwrap_or_else(OffsetDateTime::now_utc);
        let document = self
            .render_upstream(locator, last_updated, deadline)
            .await
            .map_err(|Expired| self.expired())??;

        let Some(revision) = revision else {
            return Ok(FetchOutcome {
                document,
                source: ServeSource::Uncached,
                cache_write: CacheWrite::Skipped {
                    reason: "no upstream revision timestamp",
                },
            });
        };

        let cache_write = self
            .write(key, &document, revision, false, deadline)
            .await
            .map_err(|Expired| self.expired())?;
        Ok(FetchOutcome {
            document,
            source: ServeSource::Rendered,
            cache_write,
        })
    }

    /// Read the cached entry. Store failures and undecodable values are
    /// logged and reported as a miss.
    async fn lookup(
        &self,
        key: &str,
        deadline: Instant,
    ) -> Result<Option<(CachedEntry, RenderedDocument)>, Expired> {
        match within(deadline, self.store.get(key)).await? {
            Ok(Some(entry)) => match entry.document() {
                Ok(document) => Ok(Some((entry, document))),
                Err(err) => {
                    warn!(key = %key, error = %err, "Cached entry is undecodable; treating as miss");
                    Ok(None)
                }
            },
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(key = %key, error = %err, "Cache read failed; treating as miss");
                Ok(None)
            }
        }
    }

    /// Fetch and render. Dependency failures are returned in the inner
    /// result so the caller can decide whether to fall back.
    async fn render_upstream(
        &self,
        locator: &ContentLocator,
        last_updated: OffsetDateTime,
        deadline: Instant,
    ) -> Result<Result<RenderedDocument, FreshnessError>, Expired> {
        let raw = match within(deadline, self.fetcher.fetch(locator)).await? {
            Ok(raw) => raw,
            Err(err) => return Ok(Err(err.into())),
        };

        let context = RenderContext::for_document(locator, &raw.path, &self.policy.raw_base_url);
        let request = RenderRequest::new(raw.body, context);

        let started = std::time::Instant::now();
        let rendered = self.renderer.render(&request);
        histogram!(METRIC_RENDER_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        let html = match rendered {
            Ok(html) => html,
            Err(err) => return Ok(Err(err.into())),
        };

        if Instant::now() >= deadline {
            return Err(Expired);
        }

        Ok(Ok(RenderedDocument::assemble(
            locator,
            &normalize_markdown(&request.markdown),
            html,
            last_updated,
        )))
    }

    /// Best-effort write. A refresh deletes the old entry first so readers
    /// never see a half-replaced value.
    async fn write(
        &self,
        key: &str,
        document: &RenderedDocument,
        revision: OffsetDateTime,
        replace: bool,
        deadline: Instant,
    ) -> Result<CacheWrite, Expired> {
        let entry = match CachedEntry::for_document(document, revision, OffsetDateTime::now_utc())
        {
            Ok(entry) => entry,
            Err(err) => return Ok(write_failed(key, err.to_string())),
        };

        if replace && let Err(err) = within(deadline, self.store.delete(key)).await? {
            warn!(key = %key, error = %err, "Failed to delete stale cache entry");
        }

        match within(deadline, self.store.set(key, &entry, self.policy.ttl)).await? {
            Ok(()) => Ok(CacheWrite::Stored),
            Err(err) => Ok(write_failed(key, err.to_string())),
        }
    }
}

fn write_failed(key: &str, message: String) -> CacheWrite {
    warn!(key = %key, error = %message, "Cache write failed; document served uncached");
    counter!(METRIC_CACHE_WRITE_FAILED).increment(1);
    CacheWrite::Failed { message }
}
