//! Unified error types for the gramkit core.
//!
//! The taxonomy mirrors how the dispatcher treats failures:
//!
//! - [`SendError`]: the outbound capability rejected a request. Swallowed by
//!   the dispatcher by default, except for requests that never encoded.
//! - [`StoreError`]: the context/log backend failed.
//! - [`BotError`]: everything that can cross a dispatcher or handler boundary.

use thiserror::Error;

// =============================================================================
// Send Errors
// =============================================================================

/// A remote send failure: the platform (or the wire in between) rejected an
/// outbound request.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The platform answered with a non-success response.
    #[error("remote API error ({code}): {description}")]
    Api {
        /// Platform error code (HTTP status when no code was provided).
        code: i64,
        /// Human readable description returned by the platform.
        description: String,
    },

    /// The HTTP exchange itself failed.
    #[error("HTTP transport error: {0}")]
    Http(String),

    /// The response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The request could not be encoded and was never sent.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl SendError {
    /// Creates an API error.
    pub fn api(code: i64, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }

    /// Whether the failure happened on the remote side of the capability.
    ///
    /// Only [`Encode`](Self::Encode) is local: the payload never left the
    /// process, so it is a bug in the caller.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by a [`ContextStore`](crate::store::ContextStore) backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A write would have overwritten an immutable record.
    #[error("record already exists: {key}")]
    Conflict {
        /// The colliding key.
        key: String,
    },

    /// The continuation token was not produced by this backend.
    #[error("invalid continuation token: {0}")]
    InvalidToken(String),

    /// A stored payload could not be encoded or decoded.
    #[error("context codec error: {0}")]
    Codec(String),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Creates a codec error.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }
}

// =============================================================================
// Bot Errors
// =============================================================================

/// Errors that can surface while constructing a bot or processing an update.
#[derive(Debug, Error)]
pub enum BotError {
    /// An outbound request failed.
    #[error(transparent)]
    Send(#[from] SendError),

    /// The context/log store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The startup `getMe` handshake did not yield an identity.
    #[error("bot identity could not be resolved: {0}")]
    Identity(String),

    /// An inbound payload was not a valid update.
    #[error("failed to decode update: {0}")]
    Decode(String),

    /// Any other failure raised by a handler or hook.
    #[error("handler failed: {0}")]
    Handler(#[from] anyhow::Error),
}

impl BotError {
    /// Wraps an arbitrary error as a handler failure.
    pub fn handler(err: impl Into<anyhow::Error>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the remote send failure behind this error, if there is one.
    ///
    /// Handler errors are searched through their whole cause chain, so a
    /// [`SendError`] wrapped with `anyhow::Context` is still found. Requests
    /// that failed to encode are not remote failures and are skipped.
    pub fn as_send_error(&self) -> Option<&SendError> {
        let found = match self {
            Self::Send(err) => Some(err),
            Self::Handler(err) => err.chain().find_map(|e| e.downcast_ref::<SendError>()),
            _ => None,
        };
        found.filter(|err| err.is_remote())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for outbound sends.
pub type SendResult<T> = Result<T, SendError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_send_error_found_directly() {
        let err = BotError::from(SendError::Timeout);
        assert!(matches!(err.as_send_error(), Some(SendError::Timeout)));
    }

    #[test]
    fn test_send_error_found_through_context() {
        let wrapped: anyhow::Result<()> =
            Err(SendError::api(403, "bot was blocked by the user")).context("notifying chat");
        let err = BotError::from(wrapped.unwrap_err());
        match err.as_send_error() {
            Some(SendError::Api { code, .. }) => assert_eq!(*code, 403),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_are_not_send_errors() {
        let err = BotError::handler(anyhow::anyhow!("boom"));
        assert!(err.as_send_error().is_none());
        assert!(BotError::Store(StoreError::backend("down")).as_send_error().is_none());
    }

    #[test]
    fn test_encode_failure_is_not_remote() {
        let err = BotError::from(SendError::Encode("sendMessage: key must be a string".into()));
        assert!(err.as_send_error().is_none());

        let wrapped: anyhow::Result<()> = Err(SendError::Encode("bad payload".into())).context("replying");
        assert!(BotError::from(wrapped.unwrap_err()).as_send_error().is_none());
    }
}
