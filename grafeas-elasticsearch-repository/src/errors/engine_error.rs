//! Search engine client error types.

use thiserror::Error;

/// Errors returned by the search engine client.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The request could not be sent or the response could not be read.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The engine answered with a non-success status code.
    #[error("Request failed with status {status}: {reason}")]
    ResponseError {
        status: u16,
        /// The engine's error type, e.g. `resource_already_exists_exception`.
        error_type: Option<String>,
        reason: String,
    },

    /// Failed to decode a response body.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The caller supplied an unusable argument (page token, routing).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A delete-by-query matched no documents.
    #[error("No documents deleted from {0}")]
    NothingDeleted(String),

    /// The caller's cancellation token fired before the call completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a response error from a status code and an engine error body.
    pub fn response(status: u16, error_type: Option<String>, reason: impl Into<String>) -> Self {
        Self::ResponseError {
            status,
            error_type,
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a nothing-deleted error for the given index.
    pub fn nothing_deleted(index: impl Into<String>) -> Self {
        Self::NothingDeleted(index.into())
    }

    /// The HTTP status of a response error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ResponseError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the engine reported the given error type.
    pub fn has_error_type(&self, expected: &str) -> bool {
        matches!(self, Self::ResponseError { error_type: Some(t), .. } if t == expected)
    }
}

impl From<opensearch::Error> for EngineError {
    fn from(err: opensearch::Error) -> Self {
        Self::ConnectionError(err.to_string())
    }
}
