use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared, WeakShared},
};
use tokio::time::Instant;

use super::{FetchOutcome, FreshnessError};

pub(crate) type RefreshResult = Result<FetchOutcome, FreshnessError>;
type RefreshFuture = BoxFuture<'static, RefreshResult>;
type SharedRefresh = Shared<RefreshFuture>;

/// The registry only holds a weak handle: once every caller has dropped its
/// handle the resolution is dropped too, and its guard clears the entry.
struct InFlight {
    generation: u64,
    deadline: Instant,
    refresh: Option<WeakShared<RefreshFuture>>,
}

/// Per-key registry of running resolutions. Concurrent callers for the same
/// key await one shared future instead of each hitting upstream.
#[derive(Default, Clone)]
pub(crate) struct InFlightRefreshes {
    refreshes: Arc<DashMap<String, InFlight>>,
    generation: Arc<AtomicU64>,
}

impl InFlightRefreshes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the resolution running for `key`, or start one with `start`.
    /// The flag is true when this caller started it. A resolution whose
    /// deadline has passed is abandoned and replaced.
    pub(crate) fn join_or_start<F>(
        &self,
        key: &str,
        deadline: Instant,
        start: F,
    ) -> (SharedRefresh, bool)
    where
        F: FnOnce() -> RefreshFuture,
    {
        // Dropping the last handle to a resolution runs its guard, which
        // needs the shard lock, so released handles must outlive the entry.
        let mut released = None;
        let joined = match self.refreshes.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let live = occupied.get().refresh.as_ref().and_then(WeakShared::upgrade);
                match live {
                    Some(refresh) if occupied.get().deadline > Instant::now() => (refresh, false),
                    stale => {
                        released = stale;
                        let (inflight, refresh) = self.launch(key, deadline, start);
                        occupied.insert(inflight);
                        (refresh, true)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let (inflight, refresh) = self.launch(key, deadline, start);
                vacant.insert(inflight);
                (refresh, true)
            }
        };
        drop(released);
        joined
    }

    fn launch<F>(&self, key: &str, deadline: Instant, start: F) -> (InFlight, SharedRefresh)
    where
        F: FnOnce() -> RefreshFuture,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let guard = RefreshGuard {
            key: key.to_string(),
            generation,
            refreshes: Arc::clone(&self.refreshes),
        };
        let work = start();
        let refresh = async move {
            let _guard = guard;
            work.await
        }
        .boxed()
        .shared();
        let inflight = InFlight {
            generation,
            deadline,
            refresh: refresh.downgrade(),
        };
        (inflight, refresh)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.refreshes.len()
    }
}

struct RefreshGuard {
    key: String,
    generation: u64,
    refreshes: Arc<DashMap<String, InFlight>>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.refreshes
            .remove_if(&self.key, |_, inflight| inflight.generation == self.generation);
    }
}
