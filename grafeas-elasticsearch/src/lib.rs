//! # Grafeas Elasticsearch
//!
//! Startup runner for the Grafeas Elasticsearch storage backend. It reads the
//! backend configuration from the environment, connects to the cluster,
//! makes sure the projects index exists and migrates outdated indexes.
//!
//! Deployments with several Grafeas replicas run this once, and start the
//! replicas with migrations disabled.
//!
//! ## Modules
//!
//! - [`config`]: Environment settings and dependency initialization

pub mod config;

pub use config::{ConnectionMode, Dependencies, Settings};

use grafeas_elasticsearch_repository::StorageError;
use thiserror::Error;

/// Errors that can occur while starting the storage backend.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Storage initialization error.
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
