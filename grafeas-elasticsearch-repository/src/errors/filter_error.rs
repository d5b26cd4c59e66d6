//! Filter translation error types.

use thiserror::Error;

/// Errors from parsing or translating a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The expression is not syntactically valid.
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The expression parsed but cannot be expressed as a query.
    #[error("Unsupported filter: {0}")]
    Unsupported(String),
}

impl FilterError {
    /// Create a syntax error at the given byte offset.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create an unsupported-expression error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
