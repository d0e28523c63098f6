//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults (or a base passed to [`ConfigLoader::defaults`])
//! 2. Profile-specific config file (`gramkit.{profile}.toml`)
//! 3. Main config file (`gramkit.toml`)
//! 4. Environment variables (`GRAMKIT_*`)
//! 5. Programmatic overrides ([`ConfigLoader::merge`])
//!
//! Files are searched in the current directory, then in the user config
//! directory (`~/.config/gramkit` on Linux). The first directory holding a
//! `gramkit.toml` wins.
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `GRAMKIT_` prefix with `__` as separator:
//!
//! - `GRAMKIT_BOT__TOKEN=123:abc` → `bot.token = "123:abc"`
//! - `GRAMKIT_POLLING__INTERVAL=5s` → `polling.interval = "5s"`
//! - `GRAMKIT_WEBHOOK__URL=https://..` → `webhook.url = "https://.."`
//!
//! The profile is picked with `GRAMKIT_PROFILE`.
//!
//! # Example
//!
//! ```rust,ignore
//! use gramkit_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .merge(Serialized::default("logging.level", "debug"))
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::{Figment, Provider};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::GramkitConfig;
use super::validation::validate_config;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "GRAMKIT_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "GRAMKIT_PROFILE";

/// Base name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "gramkit.toml";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` abbreviations.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads [`PROFILE_ENV`], defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Lowest layer.
    base: GramkitConfig,
    /// Highest layers, in merge order.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
    validate: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base: GramkitConfig::default(),
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
            validate: true,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Once any path is added the default locations are no longer searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("gramkit"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Skips [`validate_config`] on load.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Replaces the built-in defaults. Files and environment still override it.
    pub fn defaults(mut self, config: GramkitConfig) -> Self {
        self.base = config;
        self
    }

    /// Merges a provider above every other source.
    ///
    /// ```rust,ignore
    /// let config = ConfigLoader::new()
    ///     .merge(Serialized::default("bot.token", token))
    ///     .load()?;
    /// ```
    pub fn merge(mut self, provider: impl Provider) -> Self {
        self.overrides = self.overrides.merge(provider);
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<GramkitConfig> {
        let profile = self.profile.clone();
        let validate = self.validate;
        let figment = self.build_figment()?;

        let config: GramkitConfig = figment.extract()?;
        if validate {
            validate_config(&config)?;
        }

        debug!(
            profile = %profile,
            webhook = config.uses_webhook(),
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let base = std::mem::take(&mut self.base);
        let mut figment = Figment::from(Serialized::defaults(base));

        if let Some(path) = &self.config_file {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, path)?;
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("gramkit"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Searches the paths for `gramkit.{profile}.toml` then `gramkit.toml`.
    ///
    /// Stops at the first directory holding the base file. The profile file
    /// is merged under the base file, so the base file wins on conflicts.
    #[cfg(feature = "toml-config")]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let profile_name = format!("gramkit.{}.toml", self.profile.as_str());

        for search_path in self.resolve_search_paths() {
            let profile_path = search_path.join(&profile_name);
            if profile_path.exists() {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = figment.merge(Toml::file(&profile_path));
            }

            let base_path = search_path.join(CONFIG_FILE_NAME);
            if base_path.exists() {
                info!(path = %base_path.display(), "Loading configuration file");
                return figment.merge(Toml::file(&base_path));
            }
        }

        warn!("No configuration file found, using defaults");
        figment
    }

    #[cfg(not(feature = "toml-config"))]
    fn load_config_files(&self, figment: Figment) -> Figment {
        debug!(
            paths = self.resolve_search_paths().len(),
            "toml-config disabled, skipping configuration file search"
        );
        figment
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<GramkitConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<GramkitConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;
    use std::time::Duration;

    fn jailed(result: ConfigResult<GramkitConfig>) -> figment::error::Result<GramkitConfig> {
        result.map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn test_defaults_without_validation() {
        let config = ConfigLoader::new()
            .search_path("/nonexistent/gramkit")
            .without_env()
            .without_validation()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert!(config.bot.token.is_empty());
    }

    #[test]
    fn test_defaults_fail_validation() {
        let result = ConfigLoader::new()
            .search_path("/nonexistent/gramkit")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_file_env_and_override_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gramkit.toml",
                r#"
                [bot]
                token = "from-file"
                command_delimiter = "!"

                [polling]
                interval = "5s"
                limit = 20

                [logging]
                level = "warn"
                "#,
            )?;
            jail.set_env("GRAMKIT_POLLING__LIMIT", "50");
            jail.set_env("GRAMKIT_LOGGING__LEVEL", "debug");

            let config = jailed(
                ConfigLoader::new()
                    .search_path(jail.directory())
                    .merge(Serialized::default("logging.level", "trace"))
                    .load(),
            )?;

            assert_eq!(config.bot.token, "from-file");
            assert_eq!(config.bot.command_delimiter, '!');
            assert_eq!(config.polling.interval, Duration::from_secs(5));
            assert_eq!(config.polling.limit, 50);
            assert_eq!(config.logging.level, LogLevel::Trace);
            assert!(!config.uses_webhook());
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_is_loaded_under_base() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gramkit.production.toml",
                r#"
                [bot]
                token = "from-profile"

                [webhook]
                url = "https://bot.example.com/hook"
                path = "/hook"
                "#,
            )?;
            jail.create_file("gramkit.toml", "[logging]\nlevel = \"error\"\n")?;

            let config = jailed(
                ConfigLoader::new()
                    .profile("prod")
                    .search_path(jail.directory())
                    .without_env()
                    .load(),
            )?;

            assert_eq!(config.bot.token, "from-profile");
            assert_eq!(config.logging.level, LogLevel::Error);
            let webhook = config.webhook.expect("webhook table");
            assert_eq!(webhook.path, "/hook");
            assert_eq!(webhook.listen, "0.0.0.0:8443");
            assert!(webhook.serialize);
            Ok(())
        });
    }

    #[test]
    fn test_env_selects_webhook_mode() {
        Jail::expect_with(|jail| {
            jail.set_env("GRAMKIT_BOT__TOKEN", "from-env");
            jail.set_env("GRAMKIT_WEBHOOK__URL", "https://bot.example.com/webhook");

            let config = jailed(ConfigLoader::new().search_path(jail.directory()).load())?;
            assert_eq!(config.bot.token, "from-env");
            assert!(config.uses_webhook());
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new().file("/nonexistent/gramkit.toml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("gramkit.yaml", "bot: {}")?;
            let result = ConfigLoader::new().file(jail.directory().join("gramkit.yaml")).load();
            assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
            Ok(())
        });
    }

    #[test]
    fn test_bad_value_is_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("gramkit.toml", "[polling]\ninterval = \"soon\"\n")?;
            let result = ConfigLoader::new().search_path(jail.directory()).without_env().load();
            assert!(matches!(result, Err(ConfigError::Parse(_))));
            Ok(())
        });
    }
}
