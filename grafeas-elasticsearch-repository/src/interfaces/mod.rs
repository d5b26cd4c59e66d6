//! Interface definitions for the storage backend.
//!
//! The engine client, the migrator and the two storage facades are defined as
//! traits so that each layer can be exercised against a mock of the one below.

mod grafeas_storage;
mod migrator;
mod project_storage;
mod search_engine_client;

pub use grafeas_storage::GrafeasStorage;
pub use migrator::Migrator;
pub use project_storage::ProjectStorage;
pub use search_engine_client::SearchEngineClient;
