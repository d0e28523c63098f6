//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSettings, GramkitConfig, LogOutput, LoggingConfig, PollingSettings, WebhookSettings};

/// Validates the entire configuration.
pub fn validate_config(config: &GramkitConfig) -> ConfigResult<()> {
    validate_bot_settings(&config.bot)?;
    validate_polling_settings(&config.polling)?;
    if let Some(webhook) = &config.webhook {
        validate_webhook_settings(webhook)?;
    }
    validate_logging_config(&config.logging)?;

    if config.bot.request_timeout <= config.polling.long_poll_timeout {
        return Err(ConfigError::validation(format!(
            "bot.request_timeout ({:?}) must exceed polling.long_poll_timeout ({:?})",
            config.bot.request_timeout, config.polling.long_poll_timeout
        )));
    }

    Ok(())
}

fn validate_bot_settings(bot: &BotSettings) -> ConfigResult<()> {
    if bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }

    if bot.command_delimiter.is_whitespace() {
        return Err(ConfigError::validation("Command delimiter cannot be whitespace"));
    }

    validate_url(&bot.api_base_url, "bot.api_base_url")
}

fn validate_polling_settings(polling: &PollingSettings) -> ConfigResult<()> {
    if polling.interval.is_zero() {
        return Err(ConfigError::validation("Polling interval must be greater than 0"));
    }

    if !(1..=100).contains(&polling.limit) {
        return Err(ConfigError::validation(format!(
            "Polling limit must be between 1 and 100, got {}",
            polling.limit
        )));
    }

    Ok(())
}

fn validate_webhook_settings(webhook: &WebhookSettings) -> ConfigResult<()> {
    validate_url(&webhook.url, "webhook.url")?;

    if webhook.path.trim().is_empty() {
        return Err(ConfigError::missing_field("webhook.path"));
    }

    if webhook.listen.trim().is_empty() {
        return Err(ConfigError::missing_field("webhook.listen"));
    }

    if webhook.secret_token.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::validation("Webhook secret token cannot be empty"));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates an HTTP(S) URL.
fn validate_url(url: &str, field: &str) -> ConfigResult<()> {
    if url.trim().is_empty() {
        return Err(ConfigError::missing_field(field));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {:?}", valid_schemes),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid() -> GramkitConfig {
        let mut config = GramkitConfig::default();
        config.bot.token = "123:abc".to_string();
        config
    }

    #[test]
    fn test_validate_minimal_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_missing_token() {
        let result = validate_config(&GramkitConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "bot.token"));
    }

    #[test]
    fn test_validate_whitespace_delimiter() {
        let mut config = valid();
        config.bot.command_delimiter = ' ';
        assert!(matches!(validate_config(&config), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_validate_request_timeout_must_exceed_long_poll() {
        let mut config = valid();
        config.bot.request_timeout = Duration::from_secs(15);
        assert!(validate_config(&config).is_err());

        config.bot.request_timeout = Duration::from_secs(16);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_webhook() {
        let mut config = valid();
        config.webhook = Some(WebhookSettings::new(""));
        assert!(matches!(validate_config(&config), Err(ConfigError::MissingField { .. })));

        config.webhook = Some(WebhookSettings::new("ftp://example.com"));
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidUrl { .. })));

        let mut webhook = WebhookSettings::new("https://example.com/hook");
        webhook.path = String::new();
        config.webhook = Some(webhook);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "webhook.path"
        ));

        config.webhook = Some(WebhookSettings::new("https://example.com/hook"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_polling_bounds() {
        let mut config = valid();
        config.polling.interval = Duration::ZERO;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.polling.limit = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("gramkit.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
