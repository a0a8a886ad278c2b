//! Consumer module for the change indexer.
//!
//! Polls batches of change records from the broker.

mod kafka_consumer;

pub use kafka_consumer::{KafkaConsumer, KafkaConsumerConfig};

use std::time::Duration;

use async_trait::async_trait;
use change_indexer_shared::StreamRecord;

use crate::errors::IngestError;

/// A subscription to the change stream.
///
/// Records returned by `poll_batch` are acknowledged by the time the call returns: their
/// offsets are handed to the broker client and committed no later than `close`. A poll
/// that is dropped before it returns acknowledges nothing, so its records are delivered
/// again after a restart.
#[async_trait]
pub trait BrokerConsumer: Send {
    /// Join the consumer group and subscribe to the configured topic.
    fn subscribe(&mut self) -> Result<(), IngestError>;

    /// Wait up to `timeout` for records and return them in partition order.
    ///
    /// An empty batch means nothing arrived in time.
    async fn poll_batch(&mut self, timeout: Duration) -> Result<Vec<StreamRecord>, IngestError>;

    /// Commit acknowledged offsets and leave the group.
    ///
    /// Calling `close` more than once has no further effect.
    async fn close(&mut self) -> Result<(), IngestError>;
}
