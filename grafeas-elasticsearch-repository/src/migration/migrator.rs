//! Reindex-and-swap migration of a single index.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::IndexMigration;
use crate::config::{DEFAULT_MIGRATION_POLL_ATTEMPTS, DEFAULT_MIGRATION_POLL_INTERVAL_SECS};
use crate::context::cancellable_sleep;
use crate::errors::{EngineError, MigrationError};
use crate::index::IndexManager;
use crate::interfaces::{Migrator, SearchEngineClient};

/// Migrates indexes with the engine's write block, reindex and alias APIs.
///
/// Every step tolerates having already been performed, so a migration
/// interrupted at any point can be run again from the start.
pub struct ElasticsearchMigrator {
    client: Arc<dyn SearchEngineClient>,
    indexes: Arc<IndexManager>,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl ElasticsearchMigrator {
    pub fn new(client: Arc<dyn SearchEngineClient>, indexes: Arc<IndexManager>) -> Self {
        Self {
            client,
            indexes,
            poll_attempts: DEFAULT_MIGRATION_POLL_ATTEMPTS,
            poll_interval: Duration::from_secs(DEFAULT_MIGRATION_POLL_INTERVAL_SECS),
        }
    }

    /// Set how many times the reindex task is polled, and how long to wait between polls.
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    async fn ensure_write_block(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<(), MigrationError> {
        let settings = self.client.get_index_settings(ctx, index).await?;
        if is_write_blocked(&settings) {
            debug!(index = %index, "Index already has a write block");
            return Ok(());
        }

        let response = self.client.add_write_block(ctx, index).await?;
        if !(response.acknowledged && response.shards_acknowledged) {
            return Err(MigrationError::WriteBlockNotAcknowledged(index.to_string()));
        }
        info!(index = %index, "Write block placed");
        Ok(())
    }

    /// Poll the reindex task until it completes or the attempts run out.
    async fn wait_for_task(&self, ctx: &CancellationToken, task: &str) -> Result<(), MigrationError> {
        for attempt in 1..=self.poll_attempts {
            match self.client.get_task(ctx, task).await {
                Ok(status) if status.completed => {
                    if let Some(error) = status.error {
                        return Err(MigrationError::TaskFailed {
                            task: task.to_string(),
                            reason: task_error_reason(&error),
                        });
                    }
                    info!(task = %task, attempt = attempt, "Reindex task completed");
                    return Ok(());
                }
                Ok(_) => debug!(task = %task, attempt = attempt, "Reindex task still running"),
                Err(EngineError::Cancelled) => return Err(MigrationError::Cancelled),
                Err(err) => warn!(task = %task, attempt = attempt, error = %err, "Failed to poll reindex task"),
            }

            if attempt < self.poll_attempts {
                cancellable_sleep(ctx, self.poll_interval)
                    .await
                    .map_err(|_| MigrationError::Cancelled)?;
            }
        }
        Err(MigrationError::task_incomplete(task, self.poll_attempts))
    }
}

/// Whether an index's settings carry `index.blocks.write = true`.
fn is_write_blocked(settings: &Value) -> bool {
    match settings.pointer("/index/blocks/write") {
        Some(Value::String(value)) => value == "true",
        Some(Value::Bool(value)) => *value,
        _ => false,
    }
}

fn task_error_reason(error: &Value) -> String {
    error
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

#[async_trait]
impl Migrator for ElasticsearchMigrator {
    #[instrument(skip(self, ctx, migration), fields(index = %migration.index, target = %migration.target))]
    async fn migrate(
        &self,
        ctx: &CancellationToken,
        migration: &IndexMigration,
    ) -> Result<(), MigrationError> {
        info!("Starting index migration");

        self.ensure_write_block(ctx, &migration.index).await?;

        self.indexes
            .create_migration_target(ctx, self.client.as_ref(), &migration.target_info())
            .await?;

        let task = self
            .client
            .reindex(ctx, &migration.index, &migration.target)
            .await?
            .ok_or_else(|| MigrationError::MissingTask(migration.index.clone()))?;
        info!(task = %task, "Reindex started");

        self.wait_for_task(ctx, &task).await?;

        if let Err(err) = self.client.delete_task_document(ctx, &task).await {
            warn!(task = %task, error = %err, "Failed to delete reindex task document");
        }

        let holders = self.client.get_alias(ctx, &migration.alias).await?;
        if holders.contains(&migration.target) && !holders.contains(&migration.index) {
            info!(alias = %migration.alias, "Alias already points at the migration target");
        } else {
            self.client
                .swap_alias(ctx, &migration.alias, &migration.index, &migration.target)
                .await?;
        }

        self.client.delete_index(ctx, &migration.index).await?;

        info!(alias = %migration.alias, "Index migration completed");
        Ok(())
    }
}
