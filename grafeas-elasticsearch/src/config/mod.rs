//! Environment settings for the startup runner.

mod dependencies;

pub use dependencies::{ConnectionMode, Dependencies};

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use grafeas_elasticsearch_repository::config::DEFAULT_MAPPINGS_DIR;
use grafeas_elasticsearch_repository::{ElasticsearchConfig, RefreshOption, STORAGE_TYPE};
use tracing::warn;

use crate::AppError;

/// Default Elasticsearch URL.
const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Everything the runner reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage_type: String,
    pub elasticsearch: ElasticsearchConfig,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `ELASTICSEARCH_URL`: Cluster URL (default: http://localhost:9200)
    /// - `ELASTICSEARCH_USERNAME`, `ELASTICSEARCH_PASSWORD`: Basic auth credentials
    /// - `ELASTICSEARCH_REFRESH`: One of true, wait_for, false (default: true)
    /// - `ELASTICSEARCH_PIT_KEEP_ALIVE`: Point-in-time keepalive (default: 5m)
    /// - `GRAFEAS_MAPPINGS_DIR`: Directory with the mapping files (default: mappings)
    /// - `GRAFEAS_STORAGE_TYPE`: Storage type (default: elasticsearch)
    /// - `ELASTICSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `ELASTICSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("ELASTICSEARCH_URL").unwrap_or_else(|| DEFAULT_ELASTICSEARCH_URL.to_string());
        let refresh: RefreshOption = lookup("ELASTICSEARCH_REFRESH")
            .unwrap_or_else(|| RefreshOption::True.as_str().to_string())
            .parse()
            .map_err(|e| AppError::config(format!("ELASTICSEARCH_REFRESH: {}", e)))?;

        let mut elasticsearch = ElasticsearchConfig::new(url, refresh).with_mappings_dir(
            lookup("GRAFEAS_MAPPINGS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAPPINGS_DIR)),
        );
        elasticsearch.username = lookup("ELASTICSEARCH_USERNAME").filter(|u| !u.is_empty());
        elasticsearch.password = lookup("ELASTICSEARCH_PASSWORD").filter(|p| !p.is_empty());
        if let Some(keep_alive) = lookup("ELASTICSEARCH_PIT_KEEP_ALIVE") {
            elasticsearch.pit_keep_alive = keep_alive;
        }

        let retry_interval = lookup("ELASTICSEARCH_RETRY_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);

        Ok(Self {
            storage_type: lookup("GRAFEAS_STORAGE_TYPE").unwrap_or_else(|| STORAGE_TYPE.to_string()),
            elasticsearch,
            connection_mode: ConnectionMode::parse(lookup("ELASTICSEARCH_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(retry_interval),
        })
    }
}

impl ConnectionMode {
    /// Parse a connection mode, case-insensitively.
    ///
    /// Valid values: "fail-fast" or "retry". Defaults to "retry" if not set or invalid.
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid ELASTICSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}
