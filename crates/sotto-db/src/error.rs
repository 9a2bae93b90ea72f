//! Database and store error types.

use thiserror::Error;

/// Database error type.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Setting not present: {0}")]
    MissingField(String),
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Error type for the settings store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Invalid(#[from] sotto_core::Error),
}

/// Result type for settings store operations.
pub type StoreResult<T> = Result<T, StoreError>;
