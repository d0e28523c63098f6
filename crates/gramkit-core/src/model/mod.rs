//! Platform data model.
//!
//! Only the parts of the platform's object graph the framework needs to route
//! and audit events are modelled; everything else on a [`Message`] is kept
//! verbatim in its `extra` map.

pub mod message;
pub mod query;
pub mod update;

pub use message::{Chat, ChatType, Message, User};
pub use query::{CallbackQuery, ChosenInlineResult, InlineQuery};
pub use update::{Update, UpdateKind};
