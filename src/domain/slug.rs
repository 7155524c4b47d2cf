//! Heading anchor slugs.
//!
//! Anchors follow the shape GitHub gives README headings, so in-document links
//! such as `[Install](#install)` keep working once the HTML is served elsewhere.

use std::collections::HashMap;

use slug::slugify;
use thiserror::Error;

const FALLBACK_ANCHOR: &str = "section";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Duplicates receive GitHub-style suffixes in document order
/// (`usage`, `usage-1`, `usage-2`).
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headings without any sluggable text share the `section` base.
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let base = derive_slug(heading).unwrap_or_else(|_| FALLBACK_ANCHOR.to_string());
        let mut anchor = base.clone();
        // A suffixed anchor may collide with a later heading's own text.
        while self.occurrences.contains_key(&anchor) {
            let seen = self.occurrences.entry(base.clone()).or_insert(0);
            *seen += 1;
            anchor = format!("{base}-{seen}");
        }
        self.occurrences.insert(anchor.clone(), 0);
        anchor
    }
}
