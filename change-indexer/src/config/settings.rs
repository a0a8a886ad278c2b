//! Runtime settings read from environment variables.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use super::dependencies::ConnectionMode;

/// Default OpenSearch connection string file.
const DEFAULT_OPENSEARCH_CONNECTION_FILE: &str = "config/opensearch_connection.txt";

/// Default Kafka connection properties file.
const DEFAULT_KAFKA_PROPERTIES_FILE: &str = "config/kafka.properties";

/// Default destination index.
const DEFAULT_INDEX_NAME: &str = "wikimedia";

/// Default Kafka topic.
const DEFAULT_KAFKA_TOPIC: &str = "wikimedia.recentchange";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "consumer-opensearch";

/// Default poll timeout in milliseconds.
const DEFAULT_POLL_TIMEOUT_MS: u64 = 3000;

/// Default maximum number of records returned by one poll.
const DEFAULT_MAX_POLL_RECORDS: usize = 500;

/// Default maximum object nesting depth accepted by the index.
const DEFAULT_MAPPING_DEPTH_LIMIT: usize = 20;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default progress log interval in seconds.
const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 10;

/// All runtime settings of the indexer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerSettings {
    /// Explicit OpenSearch connection string, overriding the connection file.
    pub opensearch_url: Option<String>,
    /// File holding the OpenSearch connection string on its first line.
    pub opensearch_connection_file: PathBuf,
    /// How to react when the search index cannot be reached at startup.
    pub connection_mode: ConnectionMode,
    /// Delay between startup connection attempts in retry mode.
    pub retry_interval: Duration,
    /// Destination index for all documents.
    pub index_name: String,
    /// Maximum object nesting depth a payload may have.
    pub mapping_depth_limit: usize,
    /// Kafka connection properties file.
    pub kafka_properties_file: PathBuf,
    /// Broker list overriding `bootstrap.servers` from the properties file.
    pub kafka_broker: Option<String>,
    /// Topic to consume.
    pub kafka_topic: String,
    /// Consumer group the offsets are committed for.
    pub kafka_group_id: String,
    /// Upper bound on how long a single poll waits for records.
    pub poll_timeout: Duration,
    /// Maximum number of records returned by one poll.
    pub max_poll_records: usize,
    /// Minimum time between two progress log lines.
    pub progress_interval: Duration,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl IndexerSettings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch connection string (overrides the connection file)
    /// - `OPENSEARCH_CONNECTION_FILE`: Connection string file (default: config/opensearch_connection.txt)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: fail-fast)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `INDEX_NAME`: Destination index (default: wikimedia)
    /// - `MAPPING_DEPTH_LIMIT`: Maximum payload object depth (default: 20)
    /// - `KAFKA_PROPERTIES_FILE`: Kafka properties file (default: config/kafka.properties)
    /// - `KAFKA_BROKER`: Broker list overriding `bootstrap.servers`
    /// - `KAFKA_TOPIC`: Topic to consume (default: wikimedia.recentchange)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: consumer-opensearch)
    /// - `POLL_TIMEOUT_MS`: Poll timeout in milliseconds (default: 3000)
    /// - `MAX_POLL_RECORDS`: Maximum records per poll (default: 500)
    /// - `PROGRESS_INTERVAL_SECS`: Progress log interval in seconds (default: 10)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    ///
    /// Unset or empty variables take their default. Values that fail to parse are
    /// logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            opensearch_url: var("OPENSEARCH_URL"),
            opensearch_connection_file: var("OPENSEARCH_CONNECTION_FILE")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_CONNECTION_FILE.to_string())
                .into(),
            connection_mode: ConnectionMode::parse(var("OPENSEARCH_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(parse_or_default(
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                var("OPENSEARCH_RETRY_INTERVAL_SECS"),
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            index_name: var("INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            mapping_depth_limit: parse_positive_or_default(
                "MAPPING_DEPTH_LIMIT",
                var("MAPPING_DEPTH_LIMIT"),
                DEFAULT_MAPPING_DEPTH_LIMIT,
            ),
            kafka_properties_file: var("KAFKA_PROPERTIES_FILE")
                .unwrap_or_else(|| DEFAULT_KAFKA_PROPERTIES_FILE.to_string())
                .into(),
            kafka_broker: var("KAFKA_BROKER"),
            kafka_topic: var("KAFKA_TOPIC").unwrap_or_else(|| DEFAULT_KAFKA_TOPIC.to_string()),
            kafka_group_id: var("KAFKA_GROUP_ID")
                .unwrap_or_else(|| DEFAULT_KAFKA_GROUP_ID.to_string()),
            poll_timeout: Duration::from_millis(parse_positive_or_default(
                "POLL_TIMEOUT_MS",
                var("POLL_TIMEOUT_MS"),
                DEFAULT_POLL_TIMEOUT_MS,
            )),
            max_poll_records: parse_positive_or_default(
                "MAX_POLL_RECORDS",
                var("MAX_POLL_RECORDS"),
                DEFAULT_MAX_POLL_RECORDS,
            ),
            progress_interval: Duration::from_secs(parse_or_default(
                "PROGRESS_INTERVAL_SECS",
                var("PROGRESS_INTERVAL_SECS"),
                DEFAULT_PROGRESS_INTERVAL_SECS,
            )),
        }
    }
}

fn parse_or_default<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match value {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(variable = %key, value = %raw, error = %e, default = %default, "Invalid value, using default");
                default
            }
        },
    }
}

fn parse_positive_or_default<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display + Copy + PartialOrd + Default,
    T::Err: Display,
{
    let parsed = parse_or_default(key, value, default);
    if parsed > T::default() {
        parsed
    } else {
        warn!(variable = %key, default = %default, "Value must be positive, using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> IndexerSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IndexerSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = IndexerSettings::default();

        assert_eq!(settings.opensearch_url, None);
        assert_eq!(
            settings.opensearch_connection_file,
            PathBuf::from("config/opensearch_connection.txt")
        );
        assert_eq!(settings.connection_mode, ConnectionMode::FailFast);
        assert_eq!(settings.retry_interval, Duration::from_secs(15));
        assert_eq!(settings.index_name, "wikimedia");
        assert_eq!(settings.mapping_depth_limit, 20);
        assert_eq!(settings.kafka_properties_file, PathBuf::from("config/kafka.properties"));
        assert_eq!(settings.kafka_broker, None);
        assert_eq!(settings.kafka_topic, "wikimedia.recentchange");
        assert_eq!(settings.kafka_group_id, "consumer-opensearch");
        assert_eq!(settings.poll_timeout, Duration::from_millis(3000));
        assert_eq!(settings.max_poll_records, 500);
        assert_eq!(settings.progress_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("OPENSEARCH_URL", "http://localhost:9200"),
            ("OPENSEARCH_CONNECTION_MODE", "retry"),
            ("OPENSEARCH_RETRY_INTERVAL_SECS", "3"),
            ("INDEX_NAME", "changes"),
            ("MAPPING_DEPTH_LIMIT", "50"),
            ("KAFKA_BROKER", "broker:9092"),
            ("KAFKA_TOPIC", "changes.v1"),
            ("KAFKA_GROUP_ID", "indexer"),
            ("POLL_TIMEOUT_MS", "250"),
            ("MAX_POLL_RECORDS", "10"),
            ("PROGRESS_INTERVAL_SECS", "0"),
        ]);

        assert_eq!(settings.opensearch_url.as_deref(), Some("http://localhost:9200"));
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
        assert_eq!(settings.retry_interval, Duration::from_secs(3));
        assert_eq!(settings.index_name, "changes");
        assert_eq!(settings.mapping_depth_limit, 50);
        assert_eq!(settings.kafka_broker.as_deref(), Some("broker:9092"));
        assert_eq!(settings.kafka_topic, "changes.v1");
        assert_eq!(settings.kafka_group_id, "indexer");
        assert_eq!(settings.poll_timeout, Duration::from_millis(250));
        assert_eq!(settings.max_poll_records, 10);
        assert_eq!(settings.progress_interval, Duration::ZERO);
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let settings = settings_from(&[
            ("POLL_TIMEOUT_MS", "soon"),
            ("MAX_POLL_RECORDS", "0"),
            ("MAPPING_DEPTH_LIMIT", "-1"),
        ]);

        assert_eq!(settings.poll_timeout, Duration::from_millis(3000));
        assert_eq!(settings.max_poll_records, 500);
        assert_eq!(settings.mapping_depth_limit, 20);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let settings = settings_from(&[("OPENSEARCH_URL", "  "), ("KAFKA_TOPIC", "")]);

        assert_eq!(settings.opensearch_url, None);
        assert_eq!(settings.kafka_topic, "wikimedia.recentchange");
    }
}
