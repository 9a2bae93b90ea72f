//! Device error types.

use thiserror::Error;

/// Device error type.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with an error: {stderr}")]
    Failed { program: &'static str, stderr: String },

    #[error("Could not parse mixer output: {0}")]
    Parse(String),
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
