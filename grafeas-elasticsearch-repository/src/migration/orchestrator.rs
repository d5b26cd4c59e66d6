//! Startup migration of every outdated index.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::IndexMigration;
use crate::errors::MigrationError;
use crate::index::{IndexManager, GRAFEAS_META_TYPE};
use crate::interfaces::{Migrator, SearchEngineClient};

/// Finds indexes whose mapping version is behind the loaded mappings and
/// migrates them sequentially.
pub struct MigrationOrchestrator {
    client: Arc<dyn SearchEngineClient>,
    indexes: Arc<IndexManager>,
    migrator: Arc<dyn Migrator>,
}

impl MigrationOrchestrator {
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        indexes: Arc<IndexManager>,
        migrator: Arc<dyn Migrator>,
    ) -> Self {
        Self {
            client,
            indexes,
            migrator,
        }
    }

    /// List the migrations needed to bring every owned index up to date, in index name order.
    pub async fn plan(&self, ctx: &CancellationToken) -> Result<Vec<IndexMigration>, MigrationError> {
        let mappings = self.client.get_mappings(ctx).await?;

        let mut migrations = Vec::new();
        for (index, mapping) in &mappings {
            if mapping.meta_type() != Some(GRAFEAS_META_TYPE) {
                continue;
            }
            match self.indexes.outdated(index) {
                Ok(Some(_)) => migrations.push(IndexMigration::plan(&self.indexes, index)?),
                Ok(None) => {}
                Err(err) => warn!(index = %index, error = %err, "Skipping index with unrecognized name"),
            }
        }
        Ok(migrations)
    }

    /// Run every needed migration, stopping at the first failure.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - The number of indexes migrated
    /// * `Err(MigrationError)` - The error of the first failed migration
    #[instrument(skip(self, ctx))]
    pub async fn run_migrations(&self, ctx: &CancellationToken) -> Result<usize, MigrationError> {
        let migrations = self.plan(ctx).await?;
        if migrations.is_empty() {
            info!("All indexes are up to date");
            return Ok(0);
        }

        info!(count = migrations.len(), "Migrating outdated indexes");
        for migration in &migrations {
            self.migrator.migrate(ctx, migration).await?;
        }
        Ok(migrations.len())
    }
}
