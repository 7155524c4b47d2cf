//! Sweeping keys whose expiry lapsed without the store removing them.

mod common;

use std::{sync::Arc, time::Duration};

use markfresh::cache::{CacheStore, CachedEntry, KeyTtl, MemoryStore, Reaper, SweepReport};
use time::macros::datetime;
use tokio::time::Instant;

use common::FlakyStore;

fn entry() -> CachedEntry {
    CachedEntry {
        rendered_body: "{}".to_string(),
        raw_metadata_timestamp: datetime!(2024-01-01 00:00 UTC),
        stored_at: Some(datetime!(2024-01-01 00:05 UTC)),
    }
}

#[tokio::test]
async fn sweep_deletes_only_the_expired_key() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_with_expiry(
            "expired",
            &entry(),
            Some(Instant::now() - Duration::from_secs(30)),
        )
        .expect("insert expired");
    store
        .set("live", &entry(), Duration::from_secs(3600))
        .await
        .expect("insert live");

    assert_eq!(store.ttl("expired").await.expect("ttl"), KeyTtl::Expired);

    let report = Reaper::new(store.clone(), 10).sweep().await.expect("sweep");

    assert_eq!(
        report,
        SweepReport {
            scanned: 2,
            deleted: 1,
            failed: 0,
        }
    );
    assert!(!store.contains_key("expired"));
    assert!(store.contains_key("live"));
}

#[tokio::test]
async fn sweep_deletes_keys_without_expiry() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_with_expiry("persistent", &entry(), None)
        .expect("insert persistent");

    let report = Reaper::new(store.clone(), 10).sweep().await.expect("sweep");

    assert_eq!(report.deleted, 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn sweep_pages_through_more_keys_than_one_batch() {
    let store = Arc::new(MemoryStore::new());
    let lapsed = Instant::now() - Duration::from_secs(1);
    for index in 0..25 {
        store
            .insert_with_expiry(&format!("key-{index}"), &entry(), Some(lapsed))
            .expect("insert");
    }

    let report = Reaper::new(store.clone(), 4).sweep().await.expect("sweep");

    assert_eq!(report.scanned, 25);
    assert_eq!(report.deleted, 25);
    assert!(store.is_empty());
}

#[tokio::test]
async fn sweeping_an_empty_store_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let report = Reaper::new(store, 0).sweep().await.expect("sweep");
    assert_eq!(report, SweepReport::default());
}

#[tokio::test]
async fn failed_delete_does_not_stop_the_sweep() {
    let store = Arc::new(FlakyStore::default());
    let lapsed = Instant::now() - Duration::from_secs(1);
    for key in ["a", "b", "c"] {
        store
            .inner
            .insert_with_expiry(key, &entry(), Some(lapsed))
            .expect("insert");
    }
    store.refuse_delete("b");

    let report = Reaper::new(store.clone(), 1).sweep().await.expect("sweep");

    assert_eq!(
        report,
        SweepReport {
            scanned: 3,
            deleted: 2,
            failed: 1,
        }
    );
    assert!(!store.inner.contains_key("a"));
    assert!(store.inner.contains_key("b"));
    assert!(!store.inner.contains_key("c"));
}
