//! Online schema migrations.
//!
//! A migration copies a physical index into a new index carrying the current
//! mapping and moves the alias over, so readers never see both or neither.
//! The orchestrator finds outdated indexes at startup and migrates them one
//! at a time.

mod migrator;
mod orchestrator;

pub use migrator::ElasticsearchMigrator;
pub use orchestrator::MigrationOrchestrator;

use crate::errors::IndexError;
use crate::index::{DocumentKind, IndexManager, VersionedIndexInfo};

/// One planned migration from `index` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMigration {
    /// Physical index being migrated.
    pub index: String,
    /// Alias currently resolving to `index`.
    pub alias: String,
    pub kind: DocumentKind,
    /// Physical index under the current mapping version.
    pub target: String,
}

impl IndexMigration {
    /// Plan the migration of `index` to the current mapping version of its kind.
    pub fn plan(indexes: &IndexManager, index: &str) -> Result<Self, IndexError> {
        let parsed = crate::index::parse_index_name(index)?;
        Ok(Self {
            index: index.to_string(),
            alias: parsed.alias(),
            kind: parsed.kind,
            target: indexes.increment_index_version(index)?,
        })
    }

    /// The index to create as the migration target.
    pub fn target_info(&self) -> VersionedIndexInfo {
        VersionedIndexInfo {
            index: self.target.clone(),
            alias: self.alias.clone(),
            kind: self.kind,
        }
    }
}
