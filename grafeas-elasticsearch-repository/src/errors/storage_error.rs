//! Storage facade error types.
//!
//! This is the error surface seen by the hosting service. Engine failures are
//! logged where they happen and replaced by a short message, so engine
//! response bodies never reach callers.

use std::fmt;

use thiserror::Error;
use tracing::error;

use super::{EngineError, FilterError, IndexError, MigrationError};

/// Stable classification of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    Internal,
    Cancelled,
}

impl ErrorKind {
    /// The canonical lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid-argument",
            Self::AlreadyExists => "already-exists",
            Self::NotFound => "not-found",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the storage facades.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The request is malformed: bad filter, field mask, page token or configuration.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity being created already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The entity being read, updated or deleted does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend failed.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The caller cancelled the operation.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl StorageError {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an already exists error.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a cancelled error.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// The stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Classify an engine error raised while performing `context`.
    ///
    /// The engine error is logged; the returned error carries only `context`,
    /// except for invalid arguments whose message is the caller's own input.
    pub fn from_engine(context: impl Into<String>, err: EngineError) -> Self {
        let context = context.into();
        match err {
            EngineError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            EngineError::Cancelled => Self::Cancelled(context),
            EngineError::NothingDeleted(_) => Self::NotFound(context),
            other => {
                error!(error = %other, "{}", context);
                Self::Internal(context)
            }
        }
    }
}

impl From<FilterError> for StorageError {
    fn from(err: FilterError) -> Self {
        Self::InvalidArgument(format!("error parsing filter: {}", err))
    }
}

impl From<IndexError> for StorageError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Engine(engine) => Self::from_engine("error managing index", engine),
            other => {
                error!(error = %other, "Index management failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<MigrationError> for StorageError {
    fn from(err: MigrationError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled("migration cancelled".to_string());
        }
        error!(error = %err, "Migration failed");
        Self::Internal(format!("error migrating indexes: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            StorageError::invalid_argument("x").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            StorageError::already_exists("x").kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(StorageError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(StorageError::internal("x").kind(), ErrorKind::Internal);
        assert_eq!(StorageError::cancelled("x").kind(), ErrorKind::Cancelled);
        assert_eq!(ErrorKind::AlreadyExists.to_string(), "already-exists");
    }

    #[test]
    fn test_from_engine_hides_engine_details() {
        let err = StorageError::from_engine(
            "error searching projects",
            EngineError::response(500, None, "shard failure: secret internals"),
        );
        assert_eq!(
            err,
            StorageError::Internal("error searching projects".to_string())
        );
    }

    #[test]
    fn test_from_engine_classifies_special_cases() {
        assert_eq!(
            StorageError::from_engine("listing", EngineError::invalid_argument("bad token")).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            StorageError::from_engine("deleting", EngineError::nothing_deleted("idx")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StorageError::from_engine("getting", EngineError::Cancelled).kind(),
            ErrorKind::Cancelled
        );
    }

    #[test]
    fn test_filter_error_is_invalid_argument() {
        let err: StorageError = FilterError::syntax(3, "unexpected token").into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_cancelled_migration_maps_to_cancelled() {
        let err: StorageError = MigrationError::Engine(EngineError::Cancelled).into();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
