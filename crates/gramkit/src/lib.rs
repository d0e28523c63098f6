//! # Gramkit
//!
//! A command-routing bot framework for the Telegram Bot API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌────────────────────────────────────────┐
//! │ Transport            │     │ Dispatcher                             │
//! │  polling (getUpdates)│────▶│ classify ─▶ log ─▶ route ─▶ offset     │
//! │  webhook (axum)      │     │              │                         │
//! └──────────────────────┘     │   command ───┴─▶ HandlerRegistry       │
//!                              │   other    ────▶ UpdateHooks           │
//!                              └───────────────┬────────────────────────┘
//!                                              ▼
//!                         BotHandle (sends, audit log, Contexts)
//! ```
//!
//! - **Runtime**: loads configuration, installs logging, picks the delivery mode
//! - **Transport**: turns polling batches or webhook bodies into updates
//! - **Dispatcher**: one update at a time, failures contained or propagated
//! - **Handlers**: one [`CommandHandler`](prelude::CommandHandler) per command name
//! - **Store**: pluggable context and log persistence
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gramkit::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl CommandHandler for Echo {
//!     async fn execute(&self, command: &Command, bot: &BotHandle, message: &Message) -> BotResult<()> {
//!         bot.reply(message, command.args_text()).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     BotRuntime::builder()
//!         .command("echo", || Echo)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `gramkit.toml` configuration files
//! - `http-client` *(default)*: reqwest-backed Bot API client
//! - `webhook`: axum webhook receiver
//! - `json-log`: JSON log output
//! - `testing`: `MockApi` and update builders for bot test suites

pub use gramkit_core as core;
pub use gramkit_framework as framework;
pub use gramkit_runtime as runtime;
pub use gramkit_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use gramkit::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use gramkit_runtime::{BotRuntime, GramkitConfig, RuntimeError, RuntimeResult};

    // Handlers and hooks
    pub use gramkit_framework::{BotHandle, CommandHandler, ErrorDisposition, HandlerRegistry, UpdateHooks};

    // Typed contexts
    pub use gramkit_core::{Owner, OwnerKind};
    pub use gramkit_framework::Contexts;

    // Model and requests
    pub use gramkit_core::api::{AnswerCallbackQuery, SendMessage};
    pub use gramkit_core::{
        BotError, BotResult, CallbackQuery, Chat, Command, InlineQuery, Message, Update, UpdateKind, User,
    };

    // For implementing the traits above
    pub use async_trait::async_trait;
}
