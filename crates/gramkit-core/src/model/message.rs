//! Messages and the entities they reference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a chat as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// One-to-one conversation with a user.
    Private,
    /// Basic group.
    Group,
    /// Supergroup.
    Supergroup,
    /// Broadcast channel.
    Channel,
    /// Any type this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// A user or bot account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Whether this account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username, without the leading `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A chat (private conversation, group or channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier.
    pub id: i64,
    /// Chat kind.
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    /// Title, for groups and channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Username, for private chats and public groups/channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A message posted in a chat.
///
/// Fields this crate does not model are kept in `extra` so the message can be
/// written to the audit log without losing information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier unique within the chat.
    pub message_id: i64,
    /// Sender; absent for channel posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix timestamp (seconds) of when the message was sent.
    pub date: i64,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Text of the message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// The message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Returns the message text, or an empty string for non-text messages.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Returns the sender id, or 0 when the message has no sender.
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map_or(0, |u| u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_chat_type() {
        let chat: Chat = serde_json::from_value(json!({"id": 1, "type": "forum"})).unwrap();
        assert_eq!(chat.chat_type, ChatType::Unknown);
    }

    #[test]
    fn test_message_keeps_unmodelled_fields() {
        let raw = json!({
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": {"id": -100, "type": "supergroup", "title": "dev"},
            "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
            "text": "hi",
            "photo": [{"file_id": "abc"}]
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(msg.text(), "hi");
        assert_eq!(msg.sender_id(), 42);
        assert!(msg.extra.contains_key("photo"));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }
}
