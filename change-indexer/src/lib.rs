//! # Change Indexer
//!
//! Change indexer - consumes change events from Kafka and upserts them into
//! OpenSearch so that the index tracks the stream.
//!
//! ## Architecture
//!
//! The indexer follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Polls batches of records from Kafka
//! 2. **Processor**: Derives the document identity and builds upsert requests
//! 3. **Loader**: Upserts documents into OpenSearch
//! 4. **Orchestrator**: Runs the ingestion loop and its lifecycle
//! 5. **Shutdown**: Turns termination signals into a cooperative drain
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`consumer`]: Kafka consumer for change records
//! - [`processor`]: Transforms records into upsert requests
//! - [`loader`]: Upserts documents into OpenSearch
//! - [`orchestrator`]: The ingestion loop
//! - [`shutdown`]: Signal handling and shutdown coordination
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod shutdown;

pub use config::{Dependencies, IndexerSettings};
pub use errors::{IngestError, ProcessingFailure};
pub use orchestrator::{LoopState, LoopStats, Orchestrator};
pub use shutdown::{ShutdownCoordinator, ShutdownRequest};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
