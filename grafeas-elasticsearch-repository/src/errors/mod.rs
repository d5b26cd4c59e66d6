//! Error types for the storage backend.
//!
//! Each layer has its own error type. Lower layers convert into higher ones,
//! and [`StorageError`] is the only type surfaced through the storage facades.

mod engine_error;
mod filter_error;
mod index_error;
mod migration_error;
mod storage_error;

pub use engine_error::EngineError;
pub use filter_error::FilterError;
pub use index_error::IndexError;
pub use migration_error::MigrationError;
pub use storage_error::{ErrorKind, StorageError};
