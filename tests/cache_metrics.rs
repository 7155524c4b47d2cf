//! Every orchestrator path records its counter.

mod common;

use std::{collections::HashSet, sync::Arc, time::Duration};

use markfresh::{
    application::upstream::UpstreamError,
    cache::{CacheStore, CachedEntry, MemoryStore, Reaper},
    domain::locator::ContentLocator,
};
use metrics_util::debugging::DebuggingRecorder;
use time::macros::datetime;
use tokio::time::Instant;

use common::{FakeFetcher, FakeProbe, ReadOnlyStore, cache_with, memory_cache, policy};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let locator = ContentLocator::parse("https://github.com/acme/repo/blob/main/README.md")
        .expect("valid locator");

    // miss, hit, stale, fallback, degraded
    let probe = FakeProbe::at(datetime!(2024-01-01 00:00 UTC));
    let fetcher = FakeFetcher::serving("First", "README.md");
    let (_store, cache) = memory_cache(probe.clone(), fetcher.clone());
    cache.render_or_fetch(&locator).await.expect("miss");
    cache.render_or_fetch(&locator).await.expect("hit");

    probe.set_timestamp(datetime!(2024-02-01 00:00 UTC));
    cache.render_or_fetch(&locator).await.expect("stale");

    probe.set_timestamp(datetime!(2024-03-01 00:00 UTC));
    fetcher.set_error(UpstreamError::unavailable("down"));
    cache.render_or_fetch(&locator).await.expect("fallback");

    probe.set_error(UpstreamError::unavailable("down"));
    cache.render_or_fetch(&locator).await.expect("degraded");

    // write failure
    let failing = cache_with(
        Arc::new(ReadOnlyStore::default()),
        FakeProbe::at(datetime!(2024-01-01 00:00 UTC)),
        FakeFetcher::serving("Body", "README.md"),
        policy(),
    );
    failing.render_or_fetch(&locator).await.expect("served");

    // reaper deletion
    let store = Arc::new(MemoryStore::new());
    let entry = CachedEntry {
        rendered_body: "{}".to_string(),
        raw_metadata_timestamp: datetime!(2024-01-01 00:00 UTC),
        stored_at: None,
    };
    store
        .insert_with_expiry("lapsed", &entry, Some(Instant::now() - Duration::from_secs(5)))
        .expect("insert");
    Reaper::new(store.clone(), 10).sweep().await.expect("sweep");
    assert!(store.get("lapsed").await.expect("read").is_none());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "markfresh_cache_hit_total",
        "markfresh_cache_miss_total",
        "markfresh_cache_stale_total",
        "markfresh_cache_degraded_total",
        "markfresh_cache_fallback_total",
        "markfresh_cache_write_failed_total",
        "markfresh_reaper_deleted_total",
        "markfresh_render_duration_ms",
    ];
    for name in expected {
        assert!(names.contains(name), "missing metric `{name}` in {names:?}");
    }
}
