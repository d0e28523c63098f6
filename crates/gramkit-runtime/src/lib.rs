//! # Gramkit Runtime
//!
//! The host layer of a gramkit bot:
//!
//! - [`config`]: `gramkit.toml` + `GRAMKIT_*` environment loading with figment,
//!   then validation.
//! - [`logging`]: tracing subscriber setup from [`LoggingConfig`](config::LoggingConfig).
//! - [`BotRuntime`]: handshake, webhook registration or removal, then
//!   polling or webhook serving until a shutdown signal.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `json-log`: JSON log lines
//! - `http-client`: the reqwest-backed API client used when no transport is supplied
//! - `webhook`: the axum webhook receiver
//!
//! ```rust,ignore
//! use gramkit_runtime::BotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     BotRuntime::builder()
//!         .command("start", || Start)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, GramkitConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BotRuntime, RuntimeBuilder, wait_for_shutdown};

// Re-export tracing for use by bot crates
pub use tracing;
