//! # Gramkit Framework
//!
//! The update dispatch engine and everything handlers touch:
//!
//! - [`Dispatcher`]: classify, log, route and contain failures, advance the
//!   offset.
//! - [`HandlerRegistry`] and [`CommandHandler`]: case-insensitive command
//!   routing through factories.
//! - [`UpdateHooks`]: overridable behavior for plain text, unknown commands
//!   and every non-message branch, plus the error classifier.
//! - [`BotHandle`]: outbound sends with symmetric audit logging.
//! - [`Contexts`]: typed context access over any [`ContextStore`](gramkit_core::ContextStore).
//! - [`MemoryStore`]: in-process store backend.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gramkit_framework::{BotHandle, CommandHandler, Dispatcher, HandlerRegistry, MemoryStore};
//! use gramkit_core::{BotResult, Command, Message};
//!
//! struct Ping;
//!
//! #[async_trait::async_trait]
//! impl CommandHandler for Ping {
//!     async fn execute(&self, _: &Command, bot: &BotHandle, message: &Message) -> BotResult<()> {
//!         bot.reply(message, "pong").await?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("ping", || Ping);
//!
//! let dispatcher = Dispatcher::builder(api, Arc::new(MemoryStore::new()))
//!     .registry(registry)
//!     .build()
//!     .await?;
//! ```

pub mod bot;
pub mod context;
pub mod dispatcher;
pub mod hooks;
pub mod memory;
pub mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bot::BotHandle;
pub use context::{ContextCodec, Contexts, JsonCodec, TypedPage};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use hooks::{DefaultHooks, ErrorDisposition, UNKNOWN_COMMAND_REPLY, UpdateHooks, classify_default};
pub use memory::{DEFAULT_PAGE_SIZE, MemoryStore};
pub use registry::{CommandHandler, HandlerFactory, HandlerRegistry};
