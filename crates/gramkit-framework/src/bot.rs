//! The bot handle passed to handlers and hooks.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::context::Contexts;
use gramkit_core::api::{self, SendMessage};
use gramkit_core::{ApiTransport, ContextStore, LogEntry, Message, Request, SendResult, User};

/// Access to the outbound send capability and the store, bound to one bot
/// identity.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct BotHandle {
    me: Arc<User>,
    api: Arc<dyn ApiTransport>,
    store: Arc<dyn ContextStore>,
}

impl BotHandle {
    /// Creates a handle for an already resolved identity.
    pub fn new(me: User, api: Arc<dyn ApiTransport>, store: Arc<dyn ContextStore>) -> Self {
        Self {
            me: Arc::new(me),
            api,
            store,
        }
    }

    /// The bot's own user id.
    pub fn id(&self) -> i64 {
        self.me.id
    }

    /// The bot's own account, as returned by the startup handshake.
    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn api(&self) -> &Arc<dyn ApiTransport> {
        &self.api
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// JSON-typed view of the store.
    pub fn contexts(&self) -> Contexts {
        Contexts::json(Arc::clone(&self.store))
    }

    /// Sends `request` and returns the decoded response.
    ///
    /// Message-shaped responses are appended to the audit log as outbound
    /// entries. Failing to write that entry does not fail the send.
    pub async fn send<R: Request>(&self, request: &R) -> SendResult<R::Response> {
        let response = api::call(self.api.as_ref(), request).await?;

        if let Some(message) = R::sent_message(&response) {
            let entry = LogEntry::outbound(self.id(), message);
            if let Err(e) = self.store.append_log(&entry).await {
                warn!(
                    method = R::METHOD,
                    chat_id = message.chat.id,
                    error = %e,
                    "Failed to log outbound message"
                );
            }
        }

        Ok(response)
    }

    /// Replies to `message` in its chat, threaded under it.
    pub async fn reply(&self, message: &Message, text: impl Into<String>) -> SendResult<Message> {
        self.send(&SendMessage::reply_to(message, text)).await
    }
}

impl fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotHandle")
            .field("id", &self.me.id)
            .field("username", &self.me.username)
            .finish()
    }
}
