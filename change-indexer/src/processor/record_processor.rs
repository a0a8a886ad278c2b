//! Record processor implementation.
//!
//! Validates a change record and derives the upsert request for it.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use change_indexer_repository::UpsertDocumentRequest;
use change_indexer_shared::{ChangeEnvelope, StreamRecord};

use crate::errors::ProcessingFailure;

/// Nesting depth at which serde_json stops parsing.
const PARSER_NESTING_LIMIT: usize = 128;

/// Processor that transforms change records into upsert requests.
///
/// A record becomes a request when its payload is a JSON object no deeper than the
/// configured limit and carries a non-blank `meta.id`. The payload text is forwarded
/// unmodified as the document body.
#[derive(Debug, Clone)]
pub struct RecordProcessor {
    index_name: String,
    depth_limit: usize,
}

impl RecordProcessor {
    /// Create a new record processor.
    ///
    /// # Arguments
    ///
    /// * `index_name` - Destination index for every request
    /// * `depth_limit` - Maximum object nesting depth a payload may have
    pub fn new(index_name: impl Into<String>, depth_limit: usize) -> Self {
        Self {
            index_name: index_name.into(),
            depth_limit,
        }
    }

    /// Process a single record.
    ///
    /// Payloads nested beyond what the JSON parser accepts are reported as
    /// `DepthLimitExceeded` with a depth one past that bound.
    ///
    /// # Returns
    ///
    /// * `Ok(UpsertDocumentRequest)` - The request to send for this record
    /// * `Err(ProcessingFailure)` - Why the record cannot be indexed
    #[instrument(skip(self, record), fields(partition = record.partition, offset = record.offset))]
    pub fn process(
        &self,
        record: &StreamRecord,
    ) -> Result<UpsertDocumentRequest, ProcessingFailure> {
        let payload = record
            .payload
            .as_deref()
            .ok_or(ProcessingFailure::EmptyPayload)?;

        let body = std::str::from_utf8(payload)
            .map_err(|e| ProcessingFailure::malformed(format!("invalid UTF-8: {}", e)))?;

        let value: Value = serde_json::from_str(body).map_err(|e| {
            if e.to_string().starts_with("recursion limit exceeded") {
                ProcessingFailure::DepthLimitExceeded {
                    depth: self.depth_limit.max(PARSER_NESTING_LIMIT) + 1,
                    limit: self.depth_limit,
                }
            } else {
                ProcessingFailure::malformed(e.to_string())
            }
        })?;

        if !value.is_object() {
            return Err(ProcessingFailure::NotAnObject);
        }

        let depth = object_depth(&value);
        if depth > self.depth_limit {
            return Err(ProcessingFailure::DepthLimitExceeded {
                depth,
                limit: self.depth_limit,
            });
        }

        let envelope = ChangeEnvelope::deserialize(&value)
            .map_err(|e| ProcessingFailure::invalid_identity(e.to_string()))?;
        let identity = envelope
            .identity()
            .ok_or(ProcessingFailure::MissingIdentity)?;

        debug!(document_id = %identity, "Processed record");

        Ok(UpsertDocumentRequest::new(
            self.index_name.as_str(),
            identity.into_inner(),
            body,
        ))
    }
}

/// Object nesting depth of a JSON value.
///
/// The root object counts as depth 1. Arrays add no depth of their own, but objects
/// inside them do. Scalars have depth 0.
///
/// # Example
///
/// ```
/// use change_indexer::processor::object_depth;
/// use serde_json::json;
///
/// assert_eq!(object_depth(&json!({"a": 1})), 1);
/// assert_eq!(object_depth(&json!({"a": [{"b": {}}]})), 3);
/// ```
pub fn object_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(object_depth).max().unwrap_or(0),
        Value::Array(items) => items.iter().map(object_depth).max().unwrap_or(0),
        _ => 0,
    }
}
