//! Append-only audit records.
//!
//! Every processed event, inbound or outbound, becomes one [`LogEntry`]. The
//! storage key is laid out so that a plain ascending key scan returns the
//! newest entries of a chat first:
//!
//! ```text
//! table      bot{botId}year{yyyy}
//! partition  {chatId}
//! row        {u64::MAX - ticks:020}{u64::MAX - seq:020}
//! ```
//!
//! `ticks` are 100ns intervals since the Unix epoch. `seq` is a process-wide
//! counter, so two entries written in the same tick still get distinct rows.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::{CallbackQuery, ChosenInlineResult, InlineQuery, Message, UpdateKind};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Whether the event came from the platform or was sent by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// The raw event stored in a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LoggedEvent {
    Message(Message),
    InlineQuery(InlineQuery),
    ChosenInlineResult(ChosenInlineResult),
    CallbackQuery(CallbackQuery),
}

impl LoggedEvent {
    /// Returns the loggable event behind an update branch.
    ///
    /// `None` for [`UpdateKind::Unrecognized`].
    pub fn from_update(kind: &UpdateKind) -> Option<Self> {
        let event = match kind {
            UpdateKind::Message(m)
            | UpdateKind::EditedMessage(m)
            | UpdateKind::ChannelPost(m)
            | UpdateKind::EditedChannelPost(m) => Self::Message(m.clone()),
            UpdateKind::InlineQuery(q) => Self::InlineQuery(q.clone()),
            UpdateKind::ChosenInlineResult(r) => Self::ChosenInlineResult(r.clone()),
            UpdateKind::CallbackQuery(q) => Self::CallbackQuery(q.clone()),
            UpdateKind::Unrecognized => return None,
        };
        Some(event)
    }

    /// Chat the event belongs to, 0 when it has none.
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.chat.id,
            Self::CallbackQuery(q) => q.chat_id(),
            Self::InlineQuery(_) | Self::ChosenInlineResult(_) => 0,
        }
    }

    /// Account that caused the event, 0 when unknown.
    pub fn sender_id(&self) -> i64 {
        match self {
            Self::Message(m) => m.sender_id(),
            Self::InlineQuery(q) => q.from.id,
            Self::ChosenInlineResult(r) => r.from.id,
            Self::CallbackQuery(q) => q.from.id,
        }
    }

    /// When the event happened. Messages carry their own date, everything
    /// else is stamped with the current time.
    fn timestamp(&self) -> OffsetDateTime {
        match self {
            Self::Message(m) => OffsetDateTime::from_unix_timestamp(m.date)
                .unwrap_or_else(|_| OffsetDateTime::now_utc()),
            _ => OffsetDateTime::now_utc(),
        }
    }
}

/// Storage key of a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogKey {
    /// Table (or collection) name, one per bot and year.
    pub table: String,
    /// Partition key: the chat id.
    pub partition: String,
    /// Row key, ascending order is newest first.
    pub row: String,
}

impl LogKey {
    /// Builds the key for an event of `bot_id` in `chat_id` at `timestamp`.
    ///
    /// Each call consumes one sequence number, so keys are never reused
    /// within a process.
    pub fn new(bot_id: i64, chat_id: i64, timestamp: OffsetDateTime) -> Self {
        let ticks = u64::try_from(timestamp.unix_timestamp_nanos() / 100).unwrap_or(0);
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self {
            table: format!("bot{}year{}", bot_id, timestamp.year()),
            partition: chat_id.to_string(),
            row: format!("{:020}{:020}", u64::MAX - ticks, u64::MAX - seq),
        }
    }
}

impl std::fmt::Display for LogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.table, self.partition, self.row)
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    bot_id: i64,
    key: LogKey,
    chat_id: i64,
    sender_id: i64,
    direction: Direction,
    kind: String,
    #[serde(with = "time::serde::timestamp")]
    timestamp: OffsetDateTime,
    event: LoggedEvent,
}

impl LogEntry {
    /// Creates a record for `event`.
    ///
    /// `kind` names the update branch (or `"sent_message"`) the event came from.
    pub fn new(bot_id: i64, direction: Direction, kind: impl Into<String>, event: LoggedEvent) -> Self {
        let chat_id = event.chat_id();
        let timestamp = event.timestamp();
        Self {
            bot_id,
            key: LogKey::new(bot_id, chat_id, timestamp),
            chat_id,
            sender_id: event.sender_id(),
            direction,
            kind: kind.into(),
            timestamp,
            event,
        }
    }

    /// Creates an inbound record for an update branch.
    ///
    /// `None` for [`UpdateKind::Unrecognized`].
    pub fn inbound(bot_id: i64, kind: &UpdateKind) -> Option<Self> {
        LoggedEvent::from_update(kind).map(|event| Self::new(bot_id, Direction::Inbound, kind.name(), event))
    }

    /// Creates an outbound record for a message the bot sent.
    pub fn outbound(bot_id: i64, message: &Message) -> Self {
        Self::new(
            bot_id,
            Direction::Outbound,
            "sent_message",
            LoggedEvent::Message(message.clone()),
        )
    }

    pub fn bot_id(&self) -> i64 {
        self.bot_id
    }

    pub fn key(&self) -> &LogKey {
        &self.key
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn sender_id(&self) -> i64 {
        self.sender_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Update branch name, or `"sent_message"` for outbound records.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn event(&self) -> &LoggedEvent {
        &self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn message(chat: i64, date: i64) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "date": date,
            "chat": {"id": chat, "type": "private"},
            "from": {"id": 9, "first_name": "Ann"},
            "text": "hi"
        }))
        .unwrap()
    }

    #[test]
    fn test_key_layout() {
        let key = LogKey::new(42, -100, datetime!(2024-03-01 12:00 UTC));
        assert_eq!(key.table, "bot42year2024");
        assert_eq!(key.partition, "-100");
        assert_eq!(key.row.len(), 40);
        assert!(key.row.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_newer_entries_sort_first() {
        let older = LogKey::new(1, 1, datetime!(2024-01-01 00:00 UTC));
        let newer = LogKey::new(1, 1, datetime!(2024-01-01 00:01 UTC));
        assert!(newer.row < older.row);
    }

    #[test]
    fn test_same_tick_does_not_collide() {
        let at = datetime!(2024-05-05 05:05 UTC);
        let first = LogKey::new(1, 1, at);
        let second = LogKey::new(1, 1, at);
        assert_ne!(first, second);
        assert!(second.row < first.row);
    }

    #[test]
    fn test_inbound_message_entry() {
        let msg = message(77, 1_700_000_000);
        let entry = LogEntry::inbound(5, &UpdateKind::EditedMessage(msg.clone())).unwrap();

        assert_eq!(entry.bot_id(), 5);
        assert_eq!(entry.chat_id(), 77);
        assert_eq!(entry.sender_id(), 9);
        assert_eq!(entry.direction(), Direction::Inbound);
        assert_eq!(entry.kind(), "edited_message");
        assert_eq!(entry.timestamp().unix_timestamp(), 1_700_000_000);
        assert_eq!(entry.key().table, "bot5year2023");
        assert_eq!(entry.event(), &LoggedEvent::Message(msg));
    }

    #[test]
    fn test_unrecognized_is_not_logged() {
        assert!(LogEntry::inbound(5, &UpdateKind::Unrecognized).is_none());
    }

    #[test]
    fn test_outbound_entry() {
        let entry = LogEntry::outbound(5, &message(3, 1_700_000_000));
        assert_eq!(entry.direction(), Direction::Outbound);
        assert_eq!(entry.kind(), "sent_message");
        assert_eq!(entry.key().partition, "3");
    }
}
