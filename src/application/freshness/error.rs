use std::time::Duration;

use thiserror::Error;

use crate::{
    application::{render::RenderError, upstream::UpstreamError},
    cache::StoreError,
    domain::error::DomainError,
};

/// Caller-facing failure taxonomy. A cache miss is never an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FreshnessError {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream rejected the credential: {0}")]
    Unauthorized(String),
    #[error("document not found upstream: {0}")]
    DocumentMissing(String),
    #[error("upstream content could not be decoded: {0}")]
    DecodeError(String),
    #[error("document is empty")]
    EmptyContent,
    #[error("upstream has no revisions for `{0}`")]
    NoHistory(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("rendering failed: {0}")]
    Render(String),
    #[error("cache store failed: {0}")]
    Store(String),
}

impl FreshnessError {
    pub fn deadline_exceeded(deadline: Duration) -> Self {
        FreshnessError::Timeout(format!(
            "request deadline of {}s exceeded",
            deadline.as_secs_f64()
        ))
    }

    /// Stable machine-readable name, used in logs and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            FreshnessError::InvalidLocator(_) => "invalid_locator",
            FreshnessError::UpstreamUnavailable(_) => "upstream_unavailable",
            FreshnessError::Unauthorized(_) => "unauthorized",
            FreshnessError::DocumentMissing(_) => "document_missing",
            FreshnessError::DecodeError(_) => "decode_error",
            FreshnessError::EmptyContent => "empty_content",
            FreshnessError::NoHistory(_) => "no_history",
            FreshnessError::Timeout(_) => "timeout",
            FreshnessError::Render(_) => "render_failed",
            FreshnessError::Store(_) => "store_unavailable",
        }
    }
}

impl From<UpstreamError> for FreshnessError {
    fn from(error: UpstreamError) -> Self {
        match error {
            UpstreamError::Unavailable { message } => FreshnessError::UpstreamUnavailable(message),
            UpstreamError::Unauthorized { message } => FreshnessError::Unauthorized(message),
            UpstreamError::Missing { path } => FreshnessError::DocumentMissing(path),
            UpstreamError::NoHistory { path } => FreshnessError::NoHistory(path),
            UpstreamError::Decode { message } => FreshnessError::DecodeError(message),
            UpstreamError::EmptyContent => FreshnessError::EmptyContent,
            UpstreamError::Timeout => {
                FreshnessError::Timeout("upstream request timed out".to_string())
            }
        }
    }
}

impl From<RenderError> for FreshnessError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::EmptyInput | RenderError::EmptyOutput => FreshnessError::EmptyContent,
            other => FreshnessError::Render(other.to_string()),
        }
    }
}

impl From<DomainError> for FreshnessError {
    fn from(error: DomainError) -> Self {
        FreshnessError::InvalidLocator(error.to_string())
    }
}

impl From<StoreError> for FreshnessError {
    fn from(error: StoreError) -> Self {
        FreshnessError::Store(error.to_string())
    }
}
