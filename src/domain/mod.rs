//! Domain model: content locators, rendered documents, and slug helpers.

pub mod document;
pub mod error;
pub mod locator;
pub mod slug;
