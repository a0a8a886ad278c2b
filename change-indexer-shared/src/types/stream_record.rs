//! Stream record types.
//!
//! This module defines the unit of data consumed from the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single record consumed from a broker topic.
///
/// Records are produced by the broker client, handed to the ingestion loop for one
/// processing cycle and never mutated. The payload is kept as raw bytes so that it can
/// be forwarded to the document store byte-for-byte.
///
/// # Fields
///
/// - `topic`: The topic the record was read from
/// - `partition`: The source partition
/// - `offset`: The offset of the record within its partition
/// - `key`: Optional opaque record key
/// - `payload`: Optional raw payload (`None` for tombstones)
/// - `timestamp`: Optional broker timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StreamRecord {
    /// Create a record with a payload and no key or timestamp.
    ///
    /// # Example
    ///
    /// ```
    /// use change_indexer_shared::StreamRecord;
    ///
    /// let record = StreamRecord::new("wikimedia.recentchange", 0, 42, r#"{"meta":{"id":"a"}}"#);
    /// assert_eq!(record.offset, 42);
    /// assert_eq!(record.payload_len(), 19);
    /// ```
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: Some(payload.into()),
            timestamp: None,
        }
    }

    /// Create a record without a payload (a tombstone).
    pub fn tombstone(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: None,
            timestamp: None,
        }
    }

    /// Set the record key.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the broker timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Length of the payload in bytes (0 for tombstones).
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_record_new() {
        let record = StreamRecord::new("topic", 3, 7, "{}");

        assert_eq!(record.topic, "topic");
        assert_eq!(record.partition, 3);
        assert_eq!(record.offset, 7);
        assert_eq!(record.payload.as_deref(), Some("{}".as_bytes()));
        assert!(record.key.is_none());
        assert!(record.timestamp.is_none());
    }

    #[test]
    fn test_tombstone_has_no_payload() {
        let record = StreamRecord::tombstone("topic", 0, 1);

        assert!(record.payload.is_none());
        assert_eq!(record.payload_len(), 0);
    }

    #[test]
    fn test_builders() {
        let timestamp = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let record = StreamRecord::new("topic", 0, 0, "{}")
            .with_key("key-1")
            .with_timestamp(timestamp);

        assert_eq!(record.key.as_deref(), Some("key-1".as_bytes()));
        assert_eq!(record.timestamp, Some(timestamp));
    }

    #[test]
    fn test_serialization_skips_missing_fields() {
        let record = StreamRecord::tombstone("topic", 0, 1);

        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("payload").is_none());
        assert!(json.get("key").is_none());
        assert_eq!(json["offset"], 1);
    }
}
