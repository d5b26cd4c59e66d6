//! Configuration types for the Elasticsearch storage backend.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::StorageError;

/// Default directory holding the mapping files.
pub const DEFAULT_MAPPINGS_DIR: &str = "mappings";

/// Default keepalive for point-in-time handles opened by paginated searches.
pub const DEFAULT_PIT_KEEP_ALIVE: &str = "5m";

/// Default number of times a reindex task is polled before giving up.
pub const DEFAULT_MIGRATION_POLL_ATTEMPTS: u32 = 10;

/// Default delay between reindex task polls, in seconds.
pub const DEFAULT_MIGRATION_POLL_INTERVAL_SECS: u64 = 10;

/// When writes become visible to searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOption {
    /// Refresh the affected shards before returning.
    #[default]
    True,
    /// Return once the next scheduled refresh has made the write visible.
    WaitFor,
    /// Do not force a refresh.
    False,
}

impl RefreshOption {
    /// The value of the engine's `refresh` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::WaitFor => "wait_for",
            Self::False => "false",
        }
    }

    /// The value accepted by delete-by-query, which has no `wait_for`.
    ///
    /// `wait_for` asks for visibility, and `true` provides it.
    pub fn for_delete_by_query(&self) -> Self {
        match self {
            Self::WaitFor => Self::True,
            other => *other,
        }
    }
}

impl fmt::Display for RefreshOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshOption {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(Self::True),
            "wait_for" => Ok(Self::WaitFor),
            "false" => Ok(Self::False),
            other => Err(StorageError::invalid_argument(format!(
                "invalid refresh value '{}': expected one of true, wait_for, false",
                other
            ))),
        }
    }
}

/// Configuration of the Elasticsearch storage backend.
///
/// `url` and `refresh` are required. The remaining fields have defaults
/// suitable for production and are usually left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// One of `true`, `wait_for`, `false`.
    pub refresh: String,
    /// Directory containing `projects.json`, `occurrences.json` and `notes.json`.
    #[serde(default = "default_mappings_dir")]
    pub mappings_dir: PathBuf,
    /// Keepalive for point-in-time handles, in the engine's time-unit syntax.
    #[serde(default = "default_pit_keep_alive")]
    pub pit_keep_alive: String,
    /// Whether the factory migrates out-of-date indexes on startup.
    ///
    /// Disable on every replica but one when the engine cannot be relied on
    /// to reject duplicate index creation.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
    #[serde(default = "default_migration_poll_attempts")]
    pub migration_poll_attempts: u32,
    #[serde(default = "default_migration_poll_interval_secs")]
    pub migration_poll_interval_secs: u64,
}

fn default_mappings_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MAPPINGS_DIR)
}

fn default_pit_keep_alive() -> String {
    DEFAULT_PIT_KEEP_ALIVE.to_string()
}

fn default_run_migrations() -> bool {
    true
}

fn default_migration_poll_attempts() -> u32 {
    DEFAULT_MIGRATION_POLL_ATTEMPTS
}

fn default_migration_poll_interval_secs() -> u64 {
    DEFAULT_MIGRATION_POLL_INTERVAL_SECS
}

impl ElasticsearchConfig {
    /// Create a configuration with the required fields and defaults for the rest.
    pub fn new(url: impl Into<String>, refresh: RefreshOption) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            refresh: refresh.as_str().to_string(),
            mappings_dir: default_mappings_dir(),
            pit_keep_alive: default_pit_keep_alive(),
            run_migrations: default_run_migrations(),
            migration_poll_attempts: default_migration_poll_attempts(),
            migration_poll_interval_secs: default_migration_poll_interval_secs(),
        }
    }

    /// Set basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the mappings directory.
    pub fn with_mappings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mappings_dir = dir.into();
        self
    }

    /// Validate the configuration and return the parsed refresh option.
    ///
    /// # Returns
    ///
    /// * `Ok(RefreshOption)` - If the configuration is usable
    /// * `Err(StorageError::InvalidArgument)` - If the URL, credentials or refresh value are invalid
    pub fn validate(&self) -> Result<RefreshOption, StorageError> {
        if self.url.trim().is_empty() {
            return Err(StorageError::invalid_argument(
                "elasticsearch url is required",
            ));
        }
        Url::parse(&self.url).map_err(|e| {
            StorageError::invalid_argument(format!("invalid elasticsearch url: {}", e))
        })?;

        if self.password.is_some() && self.username.is_none() {
            return Err(StorageError::invalid_argument(
                "a password was provided without a username",
            ));
        }

        if self.pit_keep_alive.trim().is_empty() {
            return Err(StorageError::invalid_argument(
                "pit_keep_alive must not be empty",
            ));
        }

        self.refresh.parse()
    }

    /// Delay between reindex task polls.
    pub fn migration_poll_interval(&self) -> Duration {
        Duration::from_secs(self.migration_poll_interval_secs)
    }
}
