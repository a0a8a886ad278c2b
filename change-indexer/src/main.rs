//! Change Indexer Main Entry Point
//!
//! This is the main binary for the change indexer.
//! It consumes change events from Kafka and upserts them into OpenSearch.

use change_indexer::{Dependencies, IndexingError};
use dotenv::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("change_indexer=info,change_indexer_repository=info"));

    let json_logs = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "change-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "change-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting change indexer");

    let Dependencies {
        mut orchestrator,
        coordinator,
    } = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let signal_listener = tokio::spawn(coordinator.clone().listen_for_signals());

    let result = orchestrator.run().await;

    // A signal listener that already fired only waits for the close, which is done.
    if coordinator.is_requested() {
        if let Err(e) = signal_listener.await {
            error!(error = %e, "Signal listener failed");
        }
    } else {
        signal_listener.abort();
    }

    match result {
        Ok(stats) => {
            info!(
                documents_upserted = stats.documents_upserted,
                records_skipped = stats.records_skipped,
                upserts_failed = stats.upserts_failed,
                "Change indexer stopped"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Change indexer failed");
            Err(e.into())
        }
    }
}
