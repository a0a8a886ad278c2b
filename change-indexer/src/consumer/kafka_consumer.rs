//! Kafka consumer implementation for the change indexer.
//!
//! Polls change records from a single topic and acknowledges them by storing their
//! offsets. Periodic auto-commit is disabled, so stored offsets reach the broker only
//! through the explicit commit on close.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use futures::FutureExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::{KafkaError, RDKafkaErrorCode},
    message::{BorrowedMessage, Message},
};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use change_indexer_shared::StreamRecord;

use crate::config::BrokerProperties;
use crate::consumer::BrokerConsumer;
use crate::errors::IngestError;

/// Settings the indexer always controls, whatever the properties file says.
const ENFORCED_SETTINGS: &[(&str, &str)] = &[
    ("enable.auto.commit", "false"),
    ("enable.auto.offset.store", "false"),
];

/// Consumer settings owned by the indexer rather than the connection properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConsumerConfig {
    /// Topic to subscribe to.
    pub topic: String,
    /// Consumer group the offsets belong to.
    pub group_id: String,
    /// Upper bound on the number of records in one batch.
    pub max_poll_records: usize,
}

/// Kafka consumer for change records.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    config: KafkaConsumerConfig,
    subscribed: bool,
    closed: bool,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// The connection settings come from `properties`; the group, offset reset policy
    /// and offset handling are set by the indexer.
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance, not yet subscribed
    /// * `Err(IngestError)` - If no broker is configured or the client cannot be created
    pub fn new(
        properties: &BrokerProperties,
        config: KafkaConsumerConfig,
    ) -> Result<Self, IngestError> {
        let brokers = properties
            .bootstrap_servers()
            .ok_or_else(|| IngestError::kafka("bootstrap.servers is not configured"))?
            .to_string();

        let consumer: StreamConsumer = client_config(properties, &config)
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            topic = %config.topic,
            group_id = %config.group_id,
            max_poll_records = config.max_poll_records,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            config,
            subscribed: false,
            closed: false,
        })
    }

    /// Acknowledge a batch by storing the offset of each record.
    ///
    /// A record whose offset cannot be stored, typically because its partition was
    /// revoked, stays unacknowledged and is delivered again. The batch itself is always
    /// handed to the caller.
    ///
    /// Returns the number of offsets that could not be stored.
    fn store_offsets(&self, records: &[StreamRecord]) -> usize {
        let mut failed = 0;
        for record in records {
            if let Err(e) = self
                .consumer
                .store_offset(&record.topic, record.partition, record.offset)
            {
                warn!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Failed to store offset, record will be redelivered"
                );
                failed += 1;
            }
        }
        failed
    }

    /// Commit stored offsets, treating "nothing to commit" as success.
    fn commit(&self) -> Result<(), IngestError> {
        match self.consumer.commit_consumer_state(CommitMode::Sync) {
            Ok(()) => {
                debug!("Committed consumer offsets");
                Ok(())
            }
            Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => {
                debug!("No offsets to commit");
                Ok(())
            }
            Err(e) => Err(IngestError::kafka(format!("Failed to commit offsets: {}", e))),
        }
    }
}

#[async_trait]
impl BrokerConsumer for KafkaConsumer {
    fn subscribe(&mut self) -> Result<(), IngestError> {
        if self.closed {
            return Err(IngestError::kafka("Consumer is closed"));
        }

        self.consumer
            .subscribe(&[self.config.topic.as_str()])
            .map_err(|e| IngestError::kafka(e.to_string()))?;
        self.subscribed = true;

        info!(topic = %self.config.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Wait for the first record, then take whatever else is already buffered.
    async fn poll_batch(
        &mut self,
        poll_timeout: Duration,
    ) -> Result<Vec<StreamRecord>, IngestError> {
        if !self.subscribed || self.closed {
            return Err(IngestError::kafka("Consumer is not subscribed"));
        }

        let mut records = Vec::new();

        match timeout(poll_timeout, self.consumer.recv()).await {
            Ok(Ok(message)) => records.push(to_record(&message)),
            Ok(Err(e)) => return handle_recv_error(e, records),
            Err(_) => return Ok(records),
        }

        while records.len() < self.config.max_poll_records {
            match self.consumer.recv().now_or_never() {
                Some(Ok(message)) => records.push(to_record(&message)),
                Some(Err(e)) => {
                    let records = handle_recv_error(e, records)?;
                    self.store_offsets(&records);
                    return Ok(records);
                }
                None => break,
            }
        }

        self.store_offsets(&records);
        debug!(topic = %self.config.topic, record_count = records.len(), "Polled batch");
        Ok(records)
    }

    async fn close(&mut self) -> Result<(), IngestError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if !self.subscribed {
            info!("Kafka consumer closed before subscribing");
            return Ok(());
        }

        let commit_result = self.commit();
        if let Err(e) = &commit_result {
            error!(error = %e, "Final offset commit failed");
        }

        self.consumer.unsubscribe();
        self.subscribed = false;
        info!(topic = %self.config.topic, "Kafka consumer closed");

        commit_result
    }
}

/// Build the librdkafka client configuration.
///
/// Properties from the file override the defaults here, except for the group and the
/// offset handling settings, which are always the indexer's.
fn client_config(properties: &BrokerProperties, config: &KafkaConsumerConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config.set("auto.offset.reset", "earliest");

    for (key, value) in properties.iter() {
        client_config.set(key, value);
    }

    client_config.set("group.id", &config.group_id);
    for (key, value) in ENFORCED_SETTINGS {
        client_config.set(*key, *value);
    }

    client_config
}

/// Decide whether a receive error ends the loop or only the current batch.
fn handle_recv_error(
    error: KafkaError,
    records: Vec<StreamRecord>,
) -> Result<Vec<StreamRecord>, IngestError> {
    if let KafkaError::MessageConsumptionFatal(_) = error {
        error!(error = %error, "Fatal Kafka consumption error");
        return Err(error.into());
    }

    warn!(error = %error, "Kafka receive error");
    Ok(records)
}

/// Copy a borrowed message into an owned record.
fn to_record(message: &BorrowedMessage<'_>) -> StreamRecord {
    let timestamp = message
        .timestamp()
        .to_millis()
        .and_then(DateTime::from_timestamp_millis);

    StreamRecord {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec),
        timestamp,
    }
}
