//! Inline mode and callback button events.

use serde::{Deserialize, Serialize};

use super::message::{Message, User};

/// An incoming inline query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Unique identifier of the query.
    pub id: String,
    /// Sender.
    pub from: User,
    /// Text of the query.
    #[serde(default)]
    pub query: String,
    /// Pagination offset requested by the client.
    #[serde(default)]
    pub offset: String,
}

/// An inline result that was chosen by a user and sent to their chat partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    /// Identifier of the chosen result.
    pub result_id: String,
    /// The user that chose the result.
    pub from: User,
    /// The query that was used to obtain the result.
    #[serde(default)]
    pub query: String,
    /// Identifier of the sent inline message, if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
}

/// An incoming callback query from an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique identifier of the query.
    pub id: String,
    /// Sender.
    pub from: User,
    /// Message carrying the button, if it is still available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Identifier of the inline message carrying the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    /// Data associated with the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl CallbackQuery {
    /// Chat of the originating message, or 0 when unknown.
    pub fn chat_id(&self) -> i64 {
        self.message.as_ref().map_or(0, |m| m.chat.id)
    }
}
