//! Typed view over a change event payload.
//!
//! Only the fields needed to derive a document identity are modelled. Everything else in
//! the payload is ignored here and forwarded untouched to the search index.

use serde::{Deserialize, Serialize};

use crate::types::document_identity::DocumentIdentity;

/// The envelope of a change event, as far as indexing is concerned.
///
/// Change events carry their stable identifier under `meta.id`:
///
/// ```json
/// { "meta": { "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8", "domain": "..." }, "title": "..." }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEnvelope {
    #[serde(default)]
    pub meta: Option<ChangeMeta>,
}

/// The `meta` section of a change event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeMeta {
    #[serde(default)]
    pub id: Option<String>,
}

impl ChangeEnvelope {
    /// The document identity carried by this envelope, if present and non-blank.
    ///
    /// # Example
    ///
    /// ```
    /// use change_indexer_shared::ChangeEnvelope;
    ///
    /// let envelope: ChangeEnvelope =
    ///     serde_json::from_str(r#"{"meta":{"id":"abc"},"title":"Main Page"}"#).unwrap();
    /// assert_eq!(envelope.identity().unwrap().as_str(), "abc");
    /// ```
    pub fn identity(&self) -> Option<DocumentIdentity> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.id.clone())
            .and_then(DocumentIdentity::new)
    }
}
