//! Upstream adapter traits: a cheap revision probe and a full content fetch.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::locator::ContentLocator;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream unavailable: {message}")]
    Unavailable { message: String },
    #[error("upstream credential missing or rejected: {message}")]
    Unauthorized { message: String },
    #[error("document does not exist upstream: {path}")]
    Missing { path: String },
    #[error("upstream reports no revisions for `{path}`")]
    NoHistory { path: String },
    #[error("upstream payload could not be decoded: {message}")]
    Decode { message: String },
    #[error("upstream returned an empty document")]
    EmptyContent,
    #[error("upstream request timed out")]
    Timeout,
}

impl UpstreamError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Revision metadata produced per request. Never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamMetadata {
    pub last_modified: OffsetDateTime,
}

/// Decoded document body plus the repository path upstream resolved it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub body: String,
    pub path: String,
}

#[async_trait]
pub trait MetadataProbe: Send + Sync {
    /// Timestamp of the most recent revision touching the document, found
    /// without downloading its body.
    async fn last_modified(&self, locator: &ContentLocator)
    -> Result<UpstreamMetadata, UpstreamError>;
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Download and decode the document. Never retries.
    async fn fetch(&self, locator: &ContentLocator) -> Result<RawDocument, UpstreamError>;
}
