//! Index manager error types.

use thiserror::Error;

use super::EngineError;

/// Errors from loading mappings, naming indexes or creating them.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// A mapping file or directory could not be read or decoded.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// No mapping has been loaded for the named document kind.
    #[error("No mapping loaded for document kind {0}")]
    MissingMapping(String),

    /// An index name does not follow the versioned naming scheme.
    #[error("Invalid index name: {0}")]
    InvalidIndexName(String),

    /// The engine rejected an index operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl IndexError {
    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Create an invalid index name error.
    pub fn invalid_index_name(name: impl Into<String>) -> Self {
        Self::InvalidIndexName(name.into())
    }
}
