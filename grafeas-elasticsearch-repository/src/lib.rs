//! # Grafeas Elasticsearch Repository
//!
//! This crate implements the Grafeas storage contract on top of an
//! Elasticsearch-compatible search engine. It is organised in layers:
//!
//! - [`elasticsearch`]: typed client for the engine's REST surface, including
//!   point-in-time pagination and bulk operations
//! - [`filter`]: translation of filter expressions into the engine's query DSL
//! - [`index`]: versioned mappings, index naming and index creation
//! - [`migration`]: online reindex-and-swap migrations and the startup orchestrator
//! - [`storage`]: the project and Grafeas storage facades and their factory
//!
//! Every operation accepts a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and returns promptly with a cancellation error once it fires.

pub mod config;
pub mod context;
pub mod dsl;
pub mod elasticsearch;
pub mod errors;
pub mod filter;
pub mod index;
pub mod interfaces;
pub mod migration;
pub mod storage;

pub use config::{ElasticsearchConfig, RefreshOption};
pub use elasticsearch::ElasticsearchClient;
pub use errors::{
    EngineError, ErrorKind, FilterError, IndexError, MigrationError, StorageError,
};
pub use filter::Filterer;
pub use index::{DocumentKind, IndexManager, VersionedIndexInfo};
pub use interfaces::{GrafeasStorage, Migrator, ProjectStorage, SearchEngineClient};
pub use migration::{ElasticsearchMigrator, IndexMigration, MigrationOrchestrator};
pub use storage::{new_storage, ElasticsearchStorage, STORAGE_TYPE};
