use comrak::nodes::{AstNode, NodeValue};

use crate::application::render::types::{RenderContext, RenderError};
use crate::domain::slug::AnchorSlugger;

use super::assets::{file_stem, resolve_asset_url};

/// Heading anchors in document order, one per markdown heading.
#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) heading_slugs: Vec<String>,
}

pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    context: &RenderContext,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker::new(context);
    walker.visit_nodes(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'a> {
    context: &'a RenderContext,
    outcome: RewriteOutcome,
    slugger: AnchorSlugger,
}

impl<'a> RewriteWalker<'a> {
    fn new(context: &'a RenderContext) -> Self {
        Self {
            context,
            outcome: RewriteOutcome::default(),
            slugger: AnchorSlugger::new(),
        }
    }

    fn visit_nodes(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        if {
            let data = node.data.borrow();
            matches!(data.value, NodeValue::Image(_))
        } {
            process_image_node(node, self.context);
        }

        if is_heading(node) {
            let text = collect_inline_text(node);
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let slug = self.slugger.anchor_for(&normalized);
            self.outcome.heading_slugs.push(slug);
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }
}

fn process_image_node(node: &AstNode<'_>, context: &RenderContext) {
    let (src, title) = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
            _ => return,
        }
    };

    let resolved = resolve_asset_url(&src, context).unwrap_or(src);

    let alt_raw = collect_inline_text(node);
    let mut alt = alt_raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if alt.is_empty() {
        alt = file_stem(&resolved).unwrap_or_default();
    }

    let html = build_image_html(&resolved, &alt, (!title.is_empty()).then_some(title.as_str()));

    {
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlInline(html);
    }

    while let Some(child) = node.first_child() {
        child.detach();
    }
}

fn build_image_html(src: &str, alt: &str, title: Option<&str>) -> String {
    let mut html = String::with_capacity(src.len() + alt.len() + 32);
    html.push_str("<img src=\"");
    html.push_str(&escape_attribute(src));
    html.push_str("\" alt=\"");
    html.push_str(&escape_attribute(alt));
    html.push('"');

    if let Some(title) = title {
        html.push_str(" title=\"");
        html.push_str(&escape_attribute(title));
        html.push('"');
    }

    html.push_str(" />");
    html
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn is_heading(node: &AstNode<'_>) -> bool {
    matches!(node.data.borrow().value, NodeValue::Heading(_))
}
