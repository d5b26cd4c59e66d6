//! Storage facades and their factory.

mod elasticsearch;
mod field_mask;

pub use elasticsearch::ElasticsearchStorage;
pub use field_mask::apply_field_mask;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ElasticsearchConfig;
use crate::elasticsearch::ElasticsearchClient;
use crate::errors::StorageError;
use crate::index::IndexManager;
use crate::interfaces::{GrafeasStorage, ProjectStorage, SearchEngineClient};
use crate::migration::{ElasticsearchMigrator, MigrationOrchestrator};

/// Storage type name accepted by [`new_storage`].
pub const STORAGE_TYPE: &str = "elasticsearch";

/// Build the project and Grafeas storage implementations for `storage_type`.
///
/// Validates the configuration, loads the mappings, makes sure the projects
/// collection exists and, unless disabled, migrates outdated indexes before
/// returning.
///
/// # Arguments
///
/// * `ctx` - Cancellation token for the startup work
/// * `storage_type` - Must be [`STORAGE_TYPE`]
/// * `config` - Backend configuration
///
/// # Returns
///
/// * `Ok((projects, grafeas))` - Both facades, backed by the same storage
/// * `Err(StorageError::InvalidArgument)` - If the storage type or configuration is invalid
/// * `Err(StorageError)` - If index creation or a migration fails
pub async fn new_storage(
    ctx: &CancellationToken,
    storage_type: &str,
    config: &ElasticsearchConfig,
) -> Result<(Arc<dyn ProjectStorage>, Arc<dyn GrafeasStorage>), StorageError> {
    if storage_type != STORAGE_TYPE {
        return Err(StorageError::invalid_argument(format!(
            "unsupported storage type '{}', expected '{}'",
            storage_type, STORAGE_TYPE
        )));
    }
    let refresh = config.validate()?;

    let client: Arc<dyn SearchEngineClient> = Arc::new(
        ElasticsearchClient::new(config)
            .map_err(|e| StorageError::from_engine("error creating elasticsearch client", e))?,
    );
    let indexes = Arc::new(IndexManager::load_mappings(&config.mappings_dir)?);

    // An existing alias means the projects collection exists, possibly at an
    // older version that the migrations below will move forward.
    let projects = indexes.projects_index();
    let alias_exists = client
        .index_exists(ctx, &projects.alias)
        .await
        .map_err(|e| StorageError::from_engine("error checking projects index", e))?;
    if !alias_exists {
        indexes
            .create_index(ctx, client.as_ref(), &projects, true)
            .await?;
    }

    if config.run_migrations {
        let migrator = ElasticsearchMigrator::new(client.clone(), indexes.clone())
            .with_polling(config.migration_poll_attempts, config.migration_poll_interval());
        let migrated = MigrationOrchestrator::new(client.clone(), indexes.clone(), Arc::new(migrator))
            .run_migrations(ctx)
            .await?;
        info!(migrated = migrated, "Startup migrations finished");
    }

    let storage = Arc::new(ElasticsearchStorage::new(client, indexes, refresh));
    let project_storage: Arc<dyn ProjectStorage> = storage.clone();
    let grafeas_storage: Arc<dyn GrafeasStorage> = storage;
    Ok((project_storage, grafeas_storage))
}
