//! IPC error types.

use thiserror::Error;

/// IPC error type.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type for IPC operations.
pub type IpcResult<T> = Result<T, IpcError>;
