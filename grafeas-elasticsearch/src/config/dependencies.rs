//! Dependency initialization and wiring for the startup runner.

use std::sync::Arc;
use std::time::Duration;

use grafeas_elasticsearch_repository::context::cancellable_sleep;
use grafeas_elasticsearch_repository::{
    new_storage, ElasticsearchConfig, ErrorKind, GrafeasStorage, ProjectStorage, StorageError,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Settings;
use crate::AppError;

/// Connection mode for Elasticsearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at a fixed interval until successful.
    Retry,
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub project_storage: Arc<dyn ProjectStorage>,
    pub grafeas_storage: Arc<dyn GrafeasStorage>,
}

impl Dependencies {
    /// Build the storage backend, running its startup migrations.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancelled on shutdown
    /// * `settings` - Settings read from the environment
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized storage
    /// * `Err(AppError)` - If the configuration is invalid, the token is cancelled,
    ///   or initialization fails in fail-fast mode
    pub async fn new(ctx: &CancellationToken, settings: &Settings) -> Result<Self, AppError> {
        info!(
            elasticsearch_url = %settings.elasticsearch.url,
            storage_type = %settings.storage_type,
            mappings_dir = %settings.elasticsearch.mappings_dir.display(),
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let (project_storage, grafeas_storage) = Self::connect_to_elasticsearch(
            ctx,
            &settings.storage_type,
            &settings.elasticsearch,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("Elasticsearch storage initialized");

        Ok(Self {
            project_storage,
            grafeas_storage,
        })
    }

    /// Initialize storage with retry logic based on connection mode.
    ///
    /// Only backend failures are retried. Invalid configuration and
    /// cancellation end the loop in either mode.
    async fn connect_to_elasticsearch(
        ctx: &CancellationToken,
        storage_type: &str,
        config: &ElasticsearchConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<(Arc<dyn ProjectStorage>, Arc<dyn GrafeasStorage>), AppError> {
        loop {
            match new_storage(ctx, storage_type, config).await {
                Ok(storage) => return Ok(storage),
                Err(e) if e.kind() != ErrorKind::Internal => return Err(e.into()),
                Err(e) => match mode {
                    ConnectionMode::FailFast => return Err(e.into()),
                    ConnectionMode::Retry => {
                        warn!(
                            elasticsearch_url = %config.url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to initialize Elasticsearch storage, retrying..."
                        );
                        cancellable_sleep(ctx, retry_interval).await.map_err(|_| {
                            StorageError::cancelled("storage initialization cancelled")
                        })?;
                    }
                },
            }
        }
    }
}
