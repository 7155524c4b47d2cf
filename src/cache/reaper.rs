//! Sweeps keys whose expiry lapsed without the store removing them.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::store::{CacheStore, StoreError};

const SOURCE: &str = "markfresh::cache::reaper";
const DEFAULT_SCAN_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Reaper {
    store: Arc<dyn CacheStore>,
    scan_batch: usize,
}

impl Reaper {
    pub fn new(store: Arc<dyn CacheStore>, scan_batch: usize) -> Self {
        Self {
            store,
            scan_batch: if scan_batch == 0 {
                DEFAULT_SCAN_BATCH
            } else {
                scan_batch
            },
        }
    }

    /// Run one pass over every key, one scan page at a time. Per-key
    /// failures are counted and logged; only a failing scan aborts the pass.
    /// SCAN may repeat a key; a repeat reads as missing and is skipped.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();
        let mut cursor = 0;
        loop {
            let (next, page) = self.store.scan(cursor, self.scan_batch).await?;
            for key in page {
                self.sweep_key(&key, &mut report).await;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        info!(
            target: SOURCE,
            scanned = report.scanned,
            deleted = report.deleted,
            failed = report.failed,
            "Cache sweep finished"
        );
        Ok(report)
    }

    async fn sweep_key(&self, key: &str, report: &mut SweepReport) {
        report.scanned += 1;

        let ttl = match self.store.ttl(key).await {
            Ok(ttl) => ttl,
            Err(err) => {
                report.failed += 1;
                warn!(target: SOURCE, key = %key, error = %err, "Failed to read key TTL");
                return;
            }
        };

        if !ttl.is_lapsed() {
            return;
        }

        match self.store.delete(key).await {
            Ok(()) => {
                report.deleted += 1;
                counter!("markfresh_reaper_deleted_total").increment(1);
                debug!(target: SOURCE, key = %key, ttl = ?ttl, "Deleted lapsed key");
            }
            Err(err) => {
                report.failed += 1;
                warn!(target: SOURCE, key = %key, error = %err, "Failed to delete lapsed key");
            }
        }
    }
}
