//! Error types for the change indexer ingest.

use thiserror::Error;

use change_indexer_repository::SearchIndexError;

/// Errors that can occur in the change indexer ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Error from the search index.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] SearchIndexError),

    /// The ingestion loop was driven out of order.
    #[error("Loop error: {0}")]
    LoopError(String),
}

impl IngestError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a loop error.
    pub fn loop_error(msg: impl Into<String>) -> Self {
        Self::LoopError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

/// Reasons a single record cannot be turned into an upsert request.
///
/// These failures are local to one record: the record is logged and dropped and the
/// ingest continues with the next record of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingFailure {
    /// The record has no payload (tombstone).
    #[error("Record has no payload")]
    EmptyPayload,

    /// The payload is not valid UTF-8 JSON.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The payload is valid JSON but not an object.
    #[error("Payload is not a JSON object")]
    NotAnObject,

    /// The payload nests objects deeper than the search index accepts.
    #[error("Payload object depth {depth} exceeds limit {limit}")]
    DepthLimitExceeded { depth: usize, limit: usize },

    /// The payload carries no usable `meta.id`.
    #[error("Payload has no meta.id identity")]
    MissingIdentity,

    /// The identity fields have the wrong type.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
}

impl ProcessingFailure {
    /// Create a malformed payload failure.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    /// Create an invalid identity failure.
    pub fn invalid_identity(msg: impl Into<String>) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    /// Short machine-readable reason, used as a structured log field.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyPayload => "empty_payload",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::NotAnObject => "not_an_object",
            Self::DepthLimitExceeded { .. } => "depth_limit_exceeded",
            Self::MissingIdentity => "missing_identity",
            Self::InvalidIdentity(_) => "invalid_identity",
        }
    }
}
