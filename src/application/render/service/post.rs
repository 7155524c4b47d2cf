use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::application::render::types::{RenderContext, RenderError};

use super::assets::{file_stem, resolve_asset_url};

/// Final pass over sanitized HTML.
///
/// Markdown headings still carry `data-sourcepos` at this point, which is
/// how they are told apart from raw `<h1>` blocks: only they receive the
/// slugs collected from the AST, in document order.
pub(crate) fn post_process(
    html: &str,
    context: &RenderContext,
    heading_slugs: &[String],
) -> Result<String, RenderError> {
    let slugs = Rc::new(heading_slugs.to_vec());
    let next_heading = Rc::new(RefCell::new(0usize));
    let context = Rc::new(context.clone());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("h1[data-sourcepos], h2[data-sourcepos], h3[data-sourcepos], h4[data-sourcepos], h5[data-sourcepos], h6[data-sourcepos]", {
                    let slugs = Rc::clone(&slugs);
                    let next_heading = Rc::clone(&next_heading);
                    move |el| {
                        let mut idx = next_heading.borrow_mut();
                        if let Some(slug) = slugs.get(*idx) {
                            el.set_attribute("id", slug)?;
                        }
                        *idx += 1;
                        Ok(())
                    }
                }),
                element!("[data-sourcepos]", |el| {
                    el.remove_attribute("data-sourcepos");
                    Ok(())
                }),
                element!("img[src]", {
                    let context = Rc::clone(&context);
                    move |el| {
                        let Some(src) = el.get_attribute("src") else {
                            return Ok(());
                        };
                        let resolved = resolve_asset_url(&src, &context).unwrap_or(src);
                        el.set_attribute("src", &resolved)?;

                        let alt_missing = el
                            .get_attribute("alt")
                            .is_none_or(|alt| alt.trim().is_empty());
                        if alt_missing && let Some(stem) = file_stem(&resolved) {
                            el.set_attribute("alt", &stem)?;
                        }
                        Ok(())
                    }
                }),
                element!("a[href]", |el| {
                    let is_external = el
                        .get_attribute("href")
                        .is_some_and(|href| is_external_http_url(&href));
                    if is_external {
                        el.set_attribute("target", "_blank")?;
                        let rel = merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                        el.set_attribute("rel", &rel)?;
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::PostProcess {
        message: err.to_string(),
    })
}

fn is_external_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(|token| token.to_string())
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}
