//! Migrator trait definition.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::MigrationError;
use crate::migration::IndexMigration;

/// Moves one physical index to the current mapping version.
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Run the migration described by `migration` to completion.
    ///
    /// Implementations must be safe to re-run after an interrupted attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the alias now resolves to the migrated index
    /// * `Err(MigrationError)` - If any step fails or `ctx` is cancelled
    async fn migrate(
        &self,
        ctx: &CancellationToken,
        migration: &IndexMigration,
    ) -> Result<(), MigrationError>;
}
