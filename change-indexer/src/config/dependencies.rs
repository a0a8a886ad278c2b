//! Dependency initialization and wiring for the change indexer.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::credentials::{read_connection_string, BrokerProperties};
use crate::config::settings::IndexerSettings;
use crate::consumer::{KafkaConsumer, KafkaConsumerConfig};
use crate::loader::SearchLoader;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::RecordProcessor;
use crate::shutdown::ShutdownCoordinator;
use crate::IndexingError;
use change_indexer_repository::{
    ConnectionSettings, IndexBootstrap, OpenSearchProvider, SearchIndexProvider,
};

/// How startup reacts when the search index cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// Fail immediately if the index bootstrap fails.
    #[default]
    FailFast,
    /// Retry the index bootstrap at a fixed interval until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "fail-fast" if not set or invalid.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };

        match value.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            other => {
                warn!(value = %other, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'fail-fast'");
                Self::FailFast
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// Stops the orchestrator and waits for it to close.
    pub coordinator: ShutdownCoordinator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`IndexerSettings::from_env`] for the variables read.
    pub async fn new() -> Result<Self, IndexingError> {
        Self::from_settings(IndexerSettings::from_env()).await
    }

    /// Initialize all dependencies from explicit settings.
    ///
    /// The destination index is bootstrapped before the consumer is created, so no
    /// record is consumed unless the index is usable.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (bootstrap failures only in fail-fast mode)
    pub async fn from_settings(settings: IndexerSettings) -> Result<Self, IndexingError> {
        info!(
            index = %settings.index_name,
            kafka_topic = %settings.kafka_topic,
            kafka_group_id = %settings.kafka_group_id,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let connection = Self::connection_settings(&settings)?;
        let search_provider: Arc<dyn SearchIndexProvider> = Arc::new(
            OpenSearchProvider::new(&connection).map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
            })?,
        );

        let bootstrap = Self::bootstrap_index(
            search_provider.as_ref(),
            &settings.index_name,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!(index = %settings.index_name, bootstrap = ?bootstrap, "OpenSearch index ready");

        let properties = Self::broker_properties(&settings)?;
        let consumer = KafkaConsumer::new(
            &properties,
            KafkaConsumerConfig {
                topic: settings.kafka_topic.clone(),
                group_id: settings.kafka_group_id.clone(),
                max_poll_records: settings.max_poll_records,
            },
        )
        .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        let processor =
            RecordProcessor::new(settings.index_name.clone(), settings.mapping_depth_limit);
        let loader = SearchLoader::new(search_provider);

        let orchestrator = Orchestrator::with_config(
            Box::new(consumer),
            processor,
            loader,
            OrchestratorConfig {
                poll_timeout: settings.poll_timeout,
                progress_interval: settings.progress_interval,
            },
        );
        let coordinator = ShutdownCoordinator::for_orchestrator(&orchestrator);

        Ok(Self {
            orchestrator,
            coordinator,
        })
    }

    /// Resolve the OpenSearch connection from `OPENSEARCH_URL` or the connection file.
    fn connection_settings(
        settings: &IndexerSettings,
    ) -> Result<ConnectionSettings, IndexingError> {
        let connection_string = match &settings.opensearch_url {
            Some(url) => url.clone(),
            None => read_connection_string(&settings.opensearch_connection_file)?,
        };

        connection_string
            .parse::<ConnectionSettings>()
            .map_err(|e| {
                IndexingError::config(format!("Invalid OpenSearch connection string: {}", e))
            })
    }

    /// Load Kafka properties, letting `KAFKA_BROKER` override `bootstrap.servers`.
    ///
    /// A missing properties file is only accepted when a broker is given explicitly.
    fn broker_properties(settings: &IndexerSettings) -> Result<BrokerProperties, IndexingError> {
        let mut properties = if settings.kafka_properties_file.exists() {
            BrokerProperties::from_file(&settings.kafka_properties_file)?
        } else if settings.kafka_broker.is_some() {
            info!(
                path = %settings.kafka_properties_file.display(),
                "Kafka properties file not found, using KAFKA_BROKER only"
            );
            BrokerProperties::default()
        } else {
            return Err(IndexingError::config(format!(
                "Kafka properties file {} not found and KAFKA_BROKER is not set",
                settings.kafka_properties_file.display()
            )));
        };

        if let Some(broker) = &settings.kafka_broker {
            properties.set("bootstrap.servers", broker.as_str());
        }

        Ok(properties)
    }

    /// Ensure the destination index exists, retrying according to the connection mode.
    pub async fn bootstrap_index(
        provider: &dyn SearchIndexProvider,
        index: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<IndexBootstrap, IndexingError> {
        loop {
            match provider.ensure_index_exists(index).await {
                Ok(bootstrap) => return Ok(bootstrap),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to ensure index exists: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            index = %index,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to ensure index exists, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
