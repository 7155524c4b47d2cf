//! Wire format of cached values.
//!
//! Values are stored as JSON `{"content", "last_updated", "stored_at"}`.
//! `content` carries the serialized [`RenderedDocument`]; `last_updated` is the
//! upstream revision time the render was validated against and `stored_at` is
//! when this process wrote it. The two timestamps are never interchangeable.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::document::RenderedDocument;

use super::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    #[serde(rename = "content")]
    pub rendered_body: String,
    #[serde(rename = "last_updated", with = "time::serde::rfc3339")]
    pub raw_metadata_timestamp: OffsetDateTime,
    // Entries written before `stored_at` existed decode with `None`.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub stored_at: Option<OffsetDateTime>,
}

impl CachedEntry {
    pub fn for_document(
        document: &RenderedDocument,
        raw_metadata_timestamp: OffsetDateTime,
        stored_at: OffsetDateTime,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            rendered_body: serde_json::to_string(document)?,
            raw_metadata_timestamp,
            stored_at: Some(stored_at),
        })
    }

    pub fn document(&self) -> Result<RenderedDocument, StoreError> {
        Ok(serde_json::from_str(&self.rendered_body)?)
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(payload)?)
    }
}
