//! Orchestrator module for the change indexer.
//!
//! Runs the ingestion loop: poll a batch, turn each record into an upsert request and
//! send it, repeat until cancelled.

mod progress;
mod state;

pub use state::{LoopState, LoopStats};

use tokio::sync::watch;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use change_indexer_shared::StreamRecord;

use crate::consumer::BrokerConsumer;
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::RecordProcessor;
use progress::ProgressReporter;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on how long one poll waits for records.
    pub poll_timeout: Duration,
    /// Minimum time between two progress log lines; zero disables them.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(3000),
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Orchestrator that runs the ingestion loop.
///
/// The orchestrator:
/// - Subscribes the consumer and polls it until cancelled
/// - Processes the records of a batch one by one, in order
/// - Isolates failures: a bad record or a failed upsert is logged and skipped
/// - Publishes its `LoopState` so shutdown can wait for the close
///
/// Cancellation is cooperative. The token is checked before every poll and interrupts
/// a poll that is waiting for records, but never an upsert in flight: once a batch has
/// been returned it is handled completely before the loop drains.
pub struct Orchestrator {
    consumer: Box<dyn BrokerConsumer>,
    processor: RecordProcessor,
    loader: SearchLoader,
    config: OrchestratorConfig,
    cancellation: CancellationToken,
    state: watch::Sender<LoopState>,
    stats: LoopStats,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Box<dyn BrokerConsumer>,
        processor: RecordProcessor,
        loader: SearchLoader,
    ) -> Self {
        Self::with_config(consumer, processor, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Box<dyn BrokerConsumer>,
        processor: RecordProcessor,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::Init);

        Self {
            consumer,
            processor,
            loader,
            config,
            cancellation: CancellationToken::new(),
            state,
            stats: LoopStats::default(),
        }
    }

    /// A handle that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Observe the loop's lifecycle state.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Request a graceful stop. The loop drains at its next cancellation point.
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    /// Run the ingestion loop until it is cancelled or fails.
    ///
    /// The consumer is closed before this returns, whatever the outcome; the loop then
    /// publishes `LoopState::Closed`.
    ///
    /// # Returns
    ///
    /// * `Ok(LoopStats)` - The loop was cancelled and the consumer closed cleanly
    /// * `Err(IngestError)` - Subscribing, polling or closing failed
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<LoopStats, IngestError> {
        if self.state() != LoopState::Init {
            return Err(IngestError::loop_error(format!(
                "Ingestion loop cannot start from state {}",
                self.state()
            )));
        }

        info!("Starting change indexer orchestrator");

        if let Err(e) = self.consumer.subscribe() {
            error!(error = %e, "Failed to subscribe, closing without polling");
            if let Err(close_error) = self.consumer.close().await {
                warn!(error = %close_error, "Failed to close consumer after subscribe failure");
            }
            self.publish(LoopState::Closed);
            return Err(e);
        }
        self.publish(LoopState::Subscribed);

        let outcome = self.poll_until_cancelled().await;

        self.publish(LoopState::Draining);
        info!("Draining: closing consumer");
        let close_result = self.consumer.close().await;
        self.publish(LoopState::Closed);

        let stats = self.stats;
        info!(
            batches = stats.batches,
            records_received = stats.records_received,
            documents_upserted = stats.documents_upserted,
            records_skipped = stats.records_skipped,
            upserts_failed = stats.upserts_failed,
            "Orchestrator shutdown complete"
        );

        match (outcome, close_result) {
            (Err(e), close_result) => {
                if let Err(close_error) = close_result {
                    error!(error = %close_error, "Failed to close consumer");
                }
                Err(e)
            }
            (Ok(()), Err(close_error)) => {
                error!(error = %close_error, "Failed to close consumer");
                Err(close_error)
            }
            (Ok(()), Ok(())) => Ok(stats),
        }
    }

    /// Poll, process and upsert until cancellation or an unrecoverable poll error.
    async fn poll_until_cancelled(&mut self) -> Result<(), IngestError> {
        let mut progress = ProgressReporter::new(self.config.progress_interval);

        self.publish(LoopState::Polling);
        info!(poll_timeout_ms = self.config.poll_timeout.as_millis() as u64, "Polling for records");

        loop {
            if self.cancellation.is_cancelled() {
                info!("Cancellation requested, stopping before next poll");
                return Ok(());
            }

            let polled = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => None,
                batch = self.consumer.poll_batch(self.config.poll_timeout) => Some(batch),
            };

            let records = match polled {
                None => {
                    info!("Cancellation requested while polling");
                    return Ok(());
                }
                Some(Ok(records)) => records,
                Some(Err(e)) => {
                    error!(error = %e, "Unrecoverable error while polling");
                    return Err(e);
                }
            };

            if !records.is_empty() {
                self.handle_batch(records).await;
            }

            progress.maybe_report(&self.stats);
        }
    }

    /// Process and upsert every record of a batch, in order.
    async fn handle_batch(&mut self, records: Vec<StreamRecord>) {
        let record_count = records.len();
        self.stats.batches += 1;
        self.stats.records_received += record_count as u64;

        debug!(record_count = record_count, "Processing batch");

        let mut upserted = 0usize;
        for record in &records {
            if self.handle_record(record).await {
                upserted += 1;
            }
        }

        info!(
            record_count = record_count,
            documents_upserted = upserted,
            "Batch processed"
        );
    }

    /// Returns whether the record ended up in the index.
    async fn handle_record(&mut self, record: &StreamRecord) -> bool {
        let request = match self.processor.process(record) {
            Ok(request) => request,
            Err(failure) => {
                warn!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    reason = failure.reason(),
                    error = %failure,
                    "Skipping record"
                );
                self.stats.records_skipped += 1;
                return false;
            }
        };

        match self.loader.upsert(&request).await {
            Ok(_) => {
                self.stats.documents_upserted += 1;
                true
            }
            Err(e) => {
                error!(
                    document_id = %request.document_id,
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Failed to upsert document"
                );
                self.stats.upserts_failed += 1;
                false
            }
        }
    }

    fn publish(&self, next: LoopState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "Loop state changed");
            *current = next;
            true
        });
    }
}
