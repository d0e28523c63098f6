//! Transport error types.

use thiserror::Error;

use gramkit_core::{BotError, SendError};

/// Errors that stop a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The webhook listener could not be bound or failed while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// A dispatcher failure the transport was configured to stop on.
    #[error("update processing failed: {0}")]
    Dispatch(#[source] BotError),

    /// A request the transport itself issued failed.
    #[error(transparent)]
    Send(#[from] SendError),

    /// The host cancelled the transport mid-operation.
    #[error("transport cancelled")]
    Cancelled,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
