use serde::{Deserialize, Serialize};

use crate::application::freshness::{CacheWrite, FetchOutcome};
use crate::domain::document::RenderedDocument;

#[derive(Debug, Deserialize)]
pub struct MarkdownQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadmeQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateQuery {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheOutcomeView {
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub write: CacheWrite,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: RenderedDocument,
    pub cache: CacheOutcomeView,
}

impl From<FetchOutcome> for DocumentResponse {
    fn from(outcome: FetchOutcome) -> Self {
        use crate::application::freshness::ServeSource;

        let source = outcome.source.label();
        let reason = match outcome.source {
            ServeSource::Degraded { reason } | ServeSource::Fallback { reason } => Some(reason),
            _ => None,
        };
        Self {
            document: outcome.document,
            cache: CacheOutcomeView {
                source,
                reason,
                write: outcome.cache_write,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: String,
}
