//! Inbound updates.
//!
//! On the wire an update is an object with an `update_id` and exactly one
//! populated branch key (`message`, `callback_query`, ...). In memory it is a
//! proper sum type: [`Update`] carries the id and an [`UpdateKind`] with one
//! case per branch. Objects without any known branch key decode to
//! [`UpdateKind::Unrecognized`] rather than failing, so newer platform event
//! kinds never stall the polling cursor. The poller gives the same treatment
//! to updates whose known branch is malformed.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::query::{CallbackQuery, ChosenInlineResult, InlineQuery};

/// One inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUpdate", into = "RawUpdate")]
pub struct Update {
    /// Strictly increasing identifier, used as the polling resume cursor.
    pub update_id: i64,
    /// The populated branch.
    pub kind: UpdateKind,
}

/// The branch of an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    /// New incoming message.
    Message(Message),
    /// New version of a known message.
    EditedMessage(Message),
    /// New incoming channel post.
    ChannelPost(Message),
    /// New version of a known channel post.
    EditedChannelPost(Message),
    /// New incoming inline query.
    InlineQuery(InlineQuery),
    /// Inline result chosen by a user.
    ChosenInlineResult(ChosenInlineResult),
    /// New incoming callback query.
    CallbackQuery(CallbackQuery),
    /// None of the known branches was populated.
    Unrecognized,
}

impl UpdateKind {
    /// Short branch name, used in logs and spans.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::EditedMessage(_) => "edited_message",
            Self::ChannelPost(_) => "channel_post",
            Self::EditedChannelPost(_) => "edited_channel_post",
            Self::InlineQuery(_) => "inline_query",
            Self::ChosenInlineResult(_) => "chosen_inline_result",
            Self::CallbackQuery(_) => "callback_query",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl Update {
    /// Creates an update.
    pub fn new(update_id: i64, kind: UpdateKind) -> Self {
        Self { update_id, kind }
    }

    /// Returns the message for the `message` branch only.
    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// Wire shape of an update.
#[derive(Default, Serialize, Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    edited_channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_query: Option<InlineQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chosen_inline_result: Option<ChosenInlineResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callback_query: Option<CallbackQuery>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let kind = if let Some(m) = raw.message {
            UpdateKind::Message(m)
        } else if let Some(m) = raw.edited_message {
            UpdateKind::EditedMessage(m)
        } else if let Some(m) = raw.channel_post {
            UpdateKind::ChannelPost(m)
        } else if let Some(m) = raw.edited_channel_post {
            UpdateKind::EditedChannelPost(m)
        } else if let Some(q) = raw.inline_query {
            UpdateKind::InlineQuery(q)
        } else if let Some(r) = raw.chosen_inline_result {
            UpdateKind::ChosenInlineResult(r)
        } else if let Some(q) = raw.callback_query {
            UpdateKind::CallbackQuery(q)
        } else {
            UpdateKind::Unrecognized
        };

        Self {
            update_id: raw.update_id,
            kind,
        }
    }
}

impl From<Update> for RawUpdate {
    fn from(update: Update) -> Self {
        let mut raw = RawUpdate {
            update_id: update.update_id,
            ..Default::default()
        };
        match update.kind {
            UpdateKind::Message(m) => raw.message = Some(m),
            UpdateKind::EditedMessage(m) => raw.edited_message = Some(m),
            UpdateKind::ChannelPost(m) => raw.channel_post = Some(m),
            UpdateKind::EditedChannelPost(m) => raw.edited_channel_post = Some(m),
            UpdateKind::InlineQuery(q) => raw.inline_query = Some(q),
            UpdateKind::ChosenInlineResult(r) => raw.chosen_inline_result = Some(r),
            UpdateKind::CallbackQuery(q) => raw.callback_query = Some(q),
            UpdateKind::Unrecognized => {}
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_message_update() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "date": 1_700_000_000,
                "chat": {"id": 5, "type": "private"},
                "text": "/start"
            }
        }))
        .unwrap();

        assert_eq!(update.update_id, 10);
        assert_eq!(update.kind.name(), "message");
        assert_eq!(update.message().map(Message::text), Some("/start"));
    }

    #[test]
    fn test_parse_callback_query_update() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 9, "first_name": "Bo"},
                "data": "vote:yes"
            }
        }))
        .unwrap();

        match update.kind {
            UpdateKind::CallbackQuery(q) => {
                assert_eq!(q.data.as_deref(), Some("vote:yes"));
                assert_eq!(q.chat_id(), 0);
            }
            other => panic!("unexpected branch: {}", other.name()),
        }
    }

    #[test]
    fn test_unknown_branch_is_unrecognized() {
        let update: Update =
            serde_json::from_value(json!({"update_id": 12, "poll": {"id": "p"}})).unwrap();
        assert_eq!(update.kind, UpdateKind::Unrecognized);
    }

    #[test]
    fn test_serializes_to_wire_shape() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 13,
            "inline_query": {"id": "q", "from": {"id": 1, "first_name": "A"}, "query": "cats"}
        }))
        .unwrap();
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["update_id"], 13);
        assert_eq!(value["inline_query"]["query"], "cats");
        assert!(value.get("message").is_none());
    }
}
