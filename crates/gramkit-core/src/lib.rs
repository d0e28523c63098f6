//! # Gramkit Core
//!
//! Data model and contracts shared by every gramkit crate.
//!
//! Nothing in here performs I/O. The crate defines:
//!
//! - **Model**: the inbound [`Update`] sum type and the platform objects it
//!   carries ([`Message`], [`Chat`], [`User`], queries).
//! - **Commands**: [`CommandParser`], a pure function from message text to an
//!   optional [`Command`].
//! - **Send capability**: the [`ApiTransport`] seam and typed [`Request`]s.
//! - **Store contract**: [`ContextStore`] for per-owner context payloads and
//!   append-only [`LogEntry`] records, with cursor pagination.
//! - **Errors**: [`SendError`], [`StoreError`] and [`BotError`].
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌─────────────────┐
//! │ Transport │────▶│ Dispatcher │────▶│ CommandParser   │
//! │ (poll/hook│     │            │────▶│ HandlerRegistry │
//! └───────────┘     └────────────┘────▶│ ContextStore    │
//!                                 └───▶│ ApiTransport    │
//!                                      └─────────────────┘
//! ```
//!
//! The dispatcher and transports live in `gramkit-framework` and
//! `gramkit-transport`.

pub mod api;
pub mod command;
pub mod error;
pub mod model;
pub mod store;

pub use api::{ApiTransport, Request};
pub use command::{Command, CommandParser, DEFAULT_DELIMITER};
pub use error::{BotError, BotResult, SendError, SendResult, StoreError, StoreResult};
pub use model::{
    CallbackQuery, Chat, ChatType, ChosenInlineResult, InlineQuery, Message, Update, UpdateKind,
    User,
};
pub use store::{
    ContextPage, ContextPayload, ContextStore, ContinuationToken, Direction, LogEntry, LogKey,
    LoggedEvent, Owner, OwnerKind, StoredContext,
};
