//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode of engine startup and the run loop.

use supermart_core::config::ConfigError;
use supermart_core::{RepoError, StoreError};
use supermart_db::DbError;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The `SQLite` store could not be opened, migrated, or read.
    #[error("database error: {source}")]
    Database {
        /// The underlying data-layer error.
        #[from]
        source: DbError,
    },

    /// Seeding the catalog or player failed.
    #[error("repository error: {source}")]
    Repository {
        /// The underlying repository error.
        #[from]
        source: RepoError,
    },

    /// The store controller rejected a command.
    #[error("store error: {source}")]
    Store {
        /// The underlying controller error.
        #[from]
        source: StoreError,
    },

    /// The scripted player section of the config is malformed.
    #[error("autopilot error: {message}")]
    Autopilot {
        /// Description of the failure.
        message: String,
    },
}
