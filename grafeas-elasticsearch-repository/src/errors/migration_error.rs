//! Migration error types.

use thiserror::Error;

use super::{EngineError, IndexError};

/// Errors from running schema migrations.
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    /// An engine call failed.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Naming or creating the target index failed.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// The engine did not acknowledge the write block on the source index.
    #[error("Write block on {0} was not acknowledged")]
    WriteBlockNotAcknowledged(String),

    /// The reindex response did not name a task.
    #[error("Reindex of {0} did not return a task id")]
    MissingTask(String),

    /// The reindex task had not completed after the final poll.
    #[error("Reindex task {task} did not complete after {attempts} polls")]
    TaskIncomplete { task: String, attempts: u32 },

    /// The reindex task completed with an error.
    #[error("Reindex task {task} failed: {reason}")]
    TaskFailed { task: String, reason: String },

    /// The caller's cancellation token fired.
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrationError {
    /// Create a task-incomplete error.
    pub fn task_incomplete(task: impl Into<String>, attempts: u32) -> Self {
        Self::TaskIncomplete {
            task: task.into(),
            attempts,
        }
    }

    /// Whether this error was caused by cancellation at any layer.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::Engine(EngineError::Cancelled)
                | Self::Index(IndexError::Engine(EngineError::Cancelled))
        )
    }
}
