use serde::Serialize;

use crate::domain::document::RenderedDocument;

/// How the served document was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServeSource {
    /// Cached entry confirmed current by the probe.
    Fresh,
    /// Cached entry was older than upstream and has been re-rendered.
    Refreshed,
    /// Nothing usable was cached; rendered from upstream.
    Rendered,
    /// Rendered from upstream without revision metadata.
    Uncached,
    /// Probe failed; the cached entry is served unverified.
    Degraded { reason: String },
    /// Refresh failed; the previous cached entry is served.
    Fallback { reason: String },
}

impl ServeSource {
    pub fn label(&self) -> &'static str {
        match self {
            ServeSource::Fresh => "fresh",
            ServeSource::Refreshed => "refreshed",
            ServeSource::Rendered => "rendered",
            ServeSource::Uncached => "uncached",
            ServeSource::Degraded { .. } => "degraded",
            ServeSource::Fallback { .. } => "fallback",
        }
    }
}

/// Result of the best-effort cache write that follows a render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CacheWrite {
    NotAttempted,
    Stored,
    Skipped { reason: &'static str },
    Failed { message: String },
}

/// A served document together with how it was produced. A failed cache
/// write still serves a correct document; callers can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub document: RenderedDocument,
    pub source: ServeSource,
    pub cache_write: CacheWrite,
}

impl FetchOutcome {
    pub(crate) fn cached(document: RenderedDocument, source: ServeSource) -> Self {
        Self {
            document,
            source,
            cache_write: CacheWrite::NotAttempted,
        }
    }

    pub fn served_from_cache(&self) -> bool {
        matches!(
            self.source,
            ServeSource::Fresh | ServeSource::Degraded { .. } | ServeSource::Fallback { .. }
        )
    }
}
