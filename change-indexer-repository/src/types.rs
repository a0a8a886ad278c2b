//! Request and response types for search index operations.

use std::fmt;

/// Request to insert or overwrite a document in the search index.
///
/// The `document_id` is the document identity derived from the change event, so
/// submitting the same request twice leaves exactly one document behind. The `body`
/// is the raw JSON payload and is sent to the backend unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertDocumentRequest {
    /// The destination index name.
    pub index: String,
    /// The document identity.
    pub document_id: String,
    /// The raw JSON document body.
    pub body: String,
}

impl UpsertDocumentRequest {
    /// Create a new upsert request.
    pub fn new(
        index: impl Into<String>,
        document_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            document_id: document_id.into(),
            body: body.into(),
        }
    }
}

/// What the search index did with an upserted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The document did not exist and was created.
    Created,
    /// An existing document with the same id was overwritten.
    Updated,
    /// Any other result reported by the backend (e.g. "noop").
    Other(String),
}

impl UpsertOutcome {
    /// Map the backend's `result` field to an outcome.
    pub fn from_result(result: &str) -> Self {
        match result {
            "created" => Self::Created,
            "updated" => Self::Updated,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Other(result) => f.write_str(result),
        }
    }
}

/// Acknowledgement for a single upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertResult {
    /// The id of the document as reported by the backend.
    pub document_id: String,
    /// What happened to the document.
    pub outcome: UpsertOutcome,
    /// The document version after the operation, if reported.
    pub version: Option<i64>,
}

/// Outcome of the startup index bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBootstrap {
    /// The index was missing and has been created with default settings.
    Created,
    /// The index already existed and was left untouched.
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_outcome_from_result() {
        assert_eq!(UpsertOutcome::from_result("created"), UpsertOutcome::Created);
        assert_eq!(UpsertOutcome::from_result("updated"), UpsertOutcome::Updated);
        assert_eq!(
            UpsertOutcome::from_result("noop"),
            UpsertOutcome::Other("noop".to_string())
        );
    }

    #[test]
    fn test_upsert_outcome_display() {
        assert_eq!(UpsertOutcome::Created.to_string(), "created");
        assert_eq!(UpsertOutcome::Other("noop".into()).to_string(), "noop");
    }
}
