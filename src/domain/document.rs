use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::locator::ContentLocator;

pub const DEFAULT_DESCRIPTION: &str = "This is the README for the repository.";
const DESCRIPTION_LIMIT: usize = 100;

/// A rendered document as handed to callers. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub html_body: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub repository: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl RenderedDocument {
    pub fn assemble(
        locator: &ContentLocator,
        markdown: &str,
        html_body: String,
        last_updated: OffsetDateTime,
    ) -> Self {
        Self {
            html_body,
            title: locator.title(),
            author: locator.owner().to_string(),
            description: summarize(markdown),
            repository: locator.repository(),
            last_updated,
        }
    }
}

/// First [`DESCRIPTION_LIMIT`] characters of the whitespace-collapsed text,
/// cut back to a word boundary. Inline HTML tags are dropped first.
pub fn summarize(markdown: &str) -> String {
    let text = strip_tags(markdown);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return DEFAULT_DESCRIPTION.to_string();
    }
    if collapsed.chars().count() <= DESCRIPTION_LIMIT {
        return collapsed;
    }

    let head: String = collapsed.chars().take(DESCRIPTION_LIMIT).collect();
    let cut = match head.rfind(' ') {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head.as_str(),
    };
    format!("{cut}...")
}

/// Remove `<tag ...>`, `</tag>` and `<!...>` spans. A `<` that does not open
/// a tag, as in `a < b`, is kept.
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        let opens_tag = candidate[1..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '/' || ch == '!');
        match candidate.find('>') {
            Some(close) if opens_tag => {
                out.push(' ');
                rest = &candidate[close + 1..];
            }
            _ => {
                out.push('<');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
