//! Markdown rendering.
//!
//! The pipeline is pure: it accepts markdown plus the document's upstream
//! location, produces deterministic HTML, and surfaces structured errors.
//! Fetching and caching happen in the caller.

mod service;
mod types;

pub(crate) use service::normalize_markdown;
pub use service::{ComrakRenderService, render_service};
pub use types::{RenderContext, RenderError, RenderRequest, RenderService};
