//! Configuration for the gramkit runtime.
//!
//! TOML files, `GRAMKIT_*` environment variables and programmatic overrides
//! are layered with figment into a [`GramkitConfig`], then validated.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSettings, GramkitConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PollingSettings,
    WebhookSettings,
};
pub use validation::validate_config;
