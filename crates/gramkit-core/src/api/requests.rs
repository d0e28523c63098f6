//! The outbound requests the framework itself needs.
//!
//! This is not a platform SDK: only identity, update fetching, webhook
//! management and the replies the default hooks send are covered. Hosts add
//! their own requests by implementing [`Request`].

use serde::Serialize;
use serde_json::Value;

use super::Request;
use crate::model::{Message, User};

/// Returns the bot's own account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetMe {}

impl Request for GetMe {
    type Response = User;
    const METHOD: &'static str = "getMe";
}

/// Long-polls for updates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetUpdates {
    /// Identifier of the first update to be returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Maximum number of updates to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Server-side long-poll timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl GetUpdates {
    /// Requests updates starting at `offset`, waiting up to `timeout` seconds.
    pub fn new(offset: i64, timeout: u64) -> Self {
        Self {
            offset: Some(offset),
            limit: None,
            timeout: Some(timeout),
        }
    }

    /// Caps the batch size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Request for GetUpdates {
    /// Raw update objects, decoded one at a time by the caller so a single
    /// malformed update cannot fail the whole batch. `None` when the
    /// platform answered with a null result.
    type Response = Option<Vec<Value>>;
    const METHOD: &'static str = "getUpdates";
}

/// Sends a text message.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    /// Target chat.
    pub chat_id: i64,
    /// Message text.
    pub text: String,
    /// Message to thread the new one under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    /// Text formatting mode (`"MarkdownV2"`, `"HTML"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    /// Send without a notification sound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

impl SendMessage {
    /// Creates a plain text message for `chat_id`.
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to_message_id: None,
            parse_mode: None,
            disable_notification: None,
        }
    }

    /// Creates a reply threaded under `message` in the same chat.
    pub fn reply_to(message: &Message, text: impl Into<String>) -> Self {
        Self::new(message.chat.id, text).reply_to_message_id(message.message_id)
    }

    /// Threads the message as a reply.
    pub fn reply_to_message_id(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    /// Sets the formatting mode.
    pub fn parse_mode(mut self, mode: impl Into<String>) -> Self {
        self.parse_mode = Some(mode.into());
        self
    }

    /// Sends silently.
    pub fn silent(mut self) -> Self {
        self.disable_notification = Some(true);
        self
    }
}

impl Request for SendMessage {
    type Response = Message;
    const METHOD: &'static str = "sendMessage";

    fn sent_message(response: &Message) -> Option<&Message> {
        Some(response)
    }
}

/// Registers a webhook url. An empty url removes the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct SetWebhook {
    /// HTTPS url to deliver updates to.
    pub url: String,
    /// Secret echoed back in the `X-Telegram-Bot-Api-Secret-Token` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

impl SetWebhook {
    /// Creates a request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret_token: None,
        }
    }

    /// Sets the secret token.
    pub fn secret_token(mut self, token: impl Into<String>) -> Self {
        self.secret_token = Some(token.into());
        self
    }
}

impl Request for SetWebhook {
    type Response = bool;
    const METHOD: &'static str = "setWebhook";
}

/// Removes the webhook so updates can be polled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteWebhook {
    /// Drop updates queued while the webhook was active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_pending_updates: Option<bool>,
}

impl Request for DeleteWebhook {
    type Response = bool;
    const METHOD: &'static str = "deleteWebhook";
}

/// Acknowledges a callback query.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallbackQuery {
    /// Identifier of the query.
    pub callback_query_id: String,
    /// Notification text shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Show an alert instead of a notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_alert: Option<bool>,
}

impl AnswerCallbackQuery {
    /// Acknowledges `callback_query_id` without any text.
    pub fn new(callback_query_id: impl Into<String>) -> Self {
        Self {
            callback_query_id: callback_query_id.into(),
            text: None,
            show_alert: None,
        }
    }

    /// Shows `text` to the user.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl Request for AnswerCallbackQuery {
    type Response = bool;
    const METHOD: &'static str = "answerCallbackQuery";
}
