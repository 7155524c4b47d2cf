mod assets;
mod config;
mod normalize;
mod post;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::Lazy;

use crate::application::render::types::{RenderError, RenderRequest, RenderService};

use config::{build_readme_sanitizer, default_options};
pub(crate) use normalize::normalize_markdown;
use post::post_process;
use rewrite::rewrite_ast;

/// Comrak-based README pipeline: normalize, parse and rewrite the AST,
/// sanitize with Ammonia, then finish links and anchors with lol_html.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_readme_sanitizer(),
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        if request.markdown.trim().is_empty() {
            return Err(RenderError::EmptyInput);
        }

        let markdown = normalize_markdown(&request.markdown);
        let arena = Arena::new();
        let root = parse_document(&arena, &markdown, &self.options);

        let outcome = rewrite_ast(root, &request.context)?;
        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = self.sanitizer.clean(&rendered_html).to_string();
        let html = post_process(&sanitized_html, &request.context, &outcome.heading_slugs)?;

        if html.trim().is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        Ok(html)
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}
