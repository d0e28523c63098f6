//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use gramkit_core::{BotError, SendError};
use gramkit_transport::TransportError;

/// Errors that can stop a [`BotRuntime`](crate::BotRuntime).
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The identity handshake or another bot-level step failed.
    #[error(transparent)]
    Bot(#[from] BotError),

    /// Registering or clearing the webhook failed.
    #[error("Failed to switch delivery mode: {0}")]
    DeliveryMode(#[source] SendError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration asks for something this build cannot do.
    #[error("Unsupported configuration: {0}")]
    Unsupported(&'static str),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
