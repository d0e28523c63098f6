//! Outbound send capability.
//!
//! The wire client is an external collaborator. The framework only needs a
//! way to invoke a named remote method with a JSON payload and get the JSON
//! result back; that seam is [`ApiTransport`]. Typed requests sit on top of it
//! through the [`Request`] trait:
//!
//! ```rust,ignore
//! use gramkit_core::api::{SendMessage, call};
//!
//! let sent = call(transport.as_ref(), &SendMessage::new(chat_id, "hello")).await?;
//! println!("sent message {}", sent.message_id);
//! ```

pub mod requests;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{SendError, SendResult};
use crate::model::Message;

pub use requests::{
    AnswerCallbackQuery, DeleteWebhook, GetMe, GetUpdates, SendMessage, SetWebhook,
};

/// The opaque wire capability: invoke `method` with `payload`, get the result.
///
/// Implementations must map every non-success outcome to a [`SendError`].
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Calls a remote method and returns its `result` value.
    async fn call(&self, method: &str, payload: Value) -> SendResult<Value>;
}

/// A typed outbound request.
pub trait Request: Serialize + Send + Sync {
    /// Decoded response type.
    type Response: DeserializeOwned + Send;

    /// Remote method name.
    const METHOD: &'static str;

    /// Returns the message contained in a response, for requests whose
    /// response is message-shaped.
    ///
    /// Such responses are appended to the audit log like inbound messages.
    fn sent_message(_response: &Self::Response) -> Option<&Message> {
        None
    }
}

/// Encodes `request`, sends it through `transport` and decodes the response.
pub async fn call<R: Request>(transport: &dyn ApiTransport, request: &R) -> SendResult<R::Response> {
    let payload = serde_json::to_value(request)
        .map_err(|e| SendError::Encode(format!("{}: {e}", R::METHOD)))?;
    debug!(method = R::METHOD, payload = %payload, "Sending request");

    let result = transport.call(R::METHOD, payload).await;
    match &result {
        Ok(value) => debug!(method = R::METHOD, response = %value, "Request succeeded"),
        Err(e) => debug!(method = R::METHOD, error = %e, "Request failed"),
    }

    serde_json::from_value(result?).map_err(|e| SendError::Decode(e.to_string()))
}
