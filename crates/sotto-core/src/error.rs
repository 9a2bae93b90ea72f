//! Error types for Sotto core.

use thiserror::Error;

/// Core error type for Sotto domain operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

impl Error {
    /// Build an `InvalidValue` error for a named field.
    #[must_use]
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue { field, value: value.into() }
    }
}

/// Result type alias for Sotto core operations.
pub type Result<T> = std::result::Result<T, Error>;
