use url::Url;

use crate::{application::render::types::RenderContext, domain::locator::encode_path};

/// Resolve a repository-relative asset reference to its raw content URL.
///
/// Returns `None` when the reference must be left untouched: fragments,
/// protocol-relative and scheme-qualified URLs (`https:`, `data:`, `mailto:`).
pub(crate) fn resolve_asset_url(reference: &str, ctx: &RenderContext) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') || reference.starts_with("//") {
        return None;
    }
    if Url::parse(reference).is_ok() {
        return None;
    }

    let split_at = reference.find(['?', '#']).unwrap_or(reference.len());
    let (path, suffix) = reference.split_at(split_at);

    let joined = if let Some(rooted) = path.strip_prefix('/') {
        rooted.to_string()
    } else {
        let dir = ctx.document_dir();
        if dir.is_empty() {
            path.to_string()
        } else {
            format!("{}/{path}", encode_path(dir))
        }
    };

    let normalized = normalize_segments(&joined);
    if normalized.is_empty() {
        return None;
    }

    Some(format!("{}{}", ctx.raw_url(&normalized), suffix))
}

/// File name without its extension, used as fallback alt text.
pub(crate) fn file_stem(reference: &str) -> Option<String> {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let name = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    };
    (!stem.is_empty()).then(|| stem.to_string())
}

fn normalize_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
