//! Overridable per-branch behavior of the dispatcher.
//!
//! Every method has a default, so an implementation only overrides what it
//! needs:
//!
//! ```rust,ignore
//! struct Hooks;
//!
//! #[async_trait]
//! impl UpdateHooks for Hooks {
//!     async fn on_callback_query(&self, bot: &BotHandle, query: &CallbackQuery) -> BotResult<()> {
//!         bot.send(&AnswerCallbackQuery::new(&query.id).text("ok")).await?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Hooks never have to write audit records: the dispatcher appends the
//! inbound log entry before any hook runs.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bot::BotHandle;
use gramkit_core::{BotError, BotResult, CallbackQuery, ChosenInlineResult, Command, InlineQuery, Message};

/// Text of the default unknown-command reply.
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command :(";

/// What the dispatcher does with a failed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Log at warning and advance the offset.
    Swallow,
    /// Log at error and return the failure to the transport without
    /// advancing the offset.
    Propagate,
}

/// Default classification: remote send failures are swallowed, everything
/// else propagates.
pub fn classify_default(error: &BotError) -> ErrorDisposition {
    if error.as_send_error().is_some() {
        ErrorDisposition::Swallow
    } else {
        ErrorDisposition::Propagate
    }
}

#[async_trait]
pub trait UpdateHooks: Send + Sync {
    /// A message that is not a command.
    async fn on_message(&self, _bot: &BotHandle, message: &Message) -> BotResult<()> {
        debug!(chat_id = message.chat.id, message_id = message.message_id, "Plain text message");
        Ok(())
    }

    /// A command with no registered handler.
    async fn on_unknown_command(&self, bot: &BotHandle, command: &Command, message: &Message) -> BotResult<()> {
        debug!(command = %command.name, chat_id = message.chat.id, "Unknown command");
        bot.reply(message, UNKNOWN_COMMAND_REPLY).await?;
        Ok(())
    }

    async fn on_edited_message(&self, _bot: &BotHandle, message: &Message) -> BotResult<()> {
        info!(chat_id = message.chat.id, message_id = message.message_id, "Message edited");
        Ok(())
    }

    async fn on_channel_post(&self, _bot: &BotHandle, post: &Message) -> BotResult<()> {
        info!(chat_id = post.chat.id, message_id = post.message_id, "Channel post");
        Ok(())
    }

    async fn on_edited_channel_post(&self, _bot: &BotHandle, post: &Message) -> BotResult<()> {
        info!(chat_id = post.chat.id, message_id = post.message_id, "Channel post edited");
        Ok(())
    }

    async fn on_inline_query(&self, _bot: &BotHandle, query: &InlineQuery) -> BotResult<()> {
        info!(query_id = %query.id, from = query.from.id, query = %query.query, "Inline query");
        Ok(())
    }

    async fn on_chosen_inline_result(&self, _bot: &BotHandle, result: &ChosenInlineResult) -> BotResult<()> {
        info!(result_id = %result.result_id, from = result.from.id, "Inline result chosen");
        Ok(())
    }

    async fn on_callback_query(&self, _bot: &BotHandle, query: &CallbackQuery) -> BotResult<()> {
        info!(query_id = %query.id, from = query.from.id, data = ?query.data, "Callback query");
        Ok(())
    }

    /// Decides whether a failure is swallowed or propagated.
    fn classify_error(&self, error: &BotError) -> ErrorDisposition {
        classify_default(error)
    }
}

/// Hooks with every default in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl UpdateHooks for DefaultHooks {}
