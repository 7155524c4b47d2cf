use thiserror::Error;

use crate::domain::locator::ContentLocator;

/// Where the document lives upstream, used to anchor relative asset references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub owner: String,
    pub repo: String,
    /// Ref understood by the raw content host.
    pub revision: String,
    /// Repository-relative path of the markdown file.
    pub document_path: String,
    /// Raw content origin without a trailing slash.
    pub raw_base_url: String,
}

impl RenderContext {
    pub fn for_document(locator: &ContentLocator, resolved_path: &str, raw_base_url: &str) -> Self {
        Self {
            owner: locator.owner().to_string(),
            repo: locator.repo().to_string(),
            revision: locator.revision().as_raw_ref().to_string(),
            document_path: resolved_path.trim_start_matches('/').to_string(),
            raw_base_url: raw_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Directory containing the document, empty at the repository root.
    pub fn document_dir(&self) -> &str {
        match self.document_path.rfind('/') {
            Some(idx) => &self.document_path[..idx],
            None => "",
        }
    }

    /// Raw URL for a normalized repository path.
    pub fn raw_url(&self, repo_path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base_url, self.owner, self.repo, self.revision, repo_path
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub markdown: String,
    pub context: RenderContext,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>, context: RenderContext) -> Self {
        Self {
            markdown: markdown.into(),
            context,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("markdown input is empty")]
    EmptyInput,
    #[error("rendered document is empty")]
    EmptyOutput,
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("html post-processing failed: {message}")]
    PostProcess { message: String },
}

/// Pure markdown-to-HTML conversion. Identical requests yield identical HTML.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError>;
}
