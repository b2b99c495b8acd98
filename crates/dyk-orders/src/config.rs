//! Service configuration.
//!
//! Loaded from `DYK_*` environment variables with fallback to defaults.
//! Business settings (invoice prefix, terms, VAT, registration mode) are not
//! configured here; they live in the settings table and are resolved per
//! order by [`crate::settings::SettingsResolver`].

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Order service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// SQLite database file
    pub db_path: String,

    /// Upper bound for one order transaction, in seconds
    pub order_timeout_secs: u64,

    /// Public site URL used in customer e-mails
    pub site_url: String,

    /// Outgoing mail
    pub smtp: SmtpConfig,
}

/// SMTP settings for the lettre transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        SmtpConfig {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_email: "info@dykskolan.se".to_string(),
            from_name: "Dykskolan".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            db_path: "./dyk.db".to_string(),
            order_timeout_secs: 30,
            site_url: "http://localhost:3000".to_string(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ServiceConfig::default();

        let smtp_enabled = env::var("DYK_SMTP_ENABLED")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let smtp = SmtpConfig {
            enabled: smtp_enabled,
            host: env::var("DYK_SMTP_HOST").unwrap_or(defaults.smtp.host),
            port: env::var("DYK_SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DYK_SMTP_PORT".to_string()))?,
            user: env::var("DYK_SMTP_USER").unwrap_or_default(),
            password: env::var("DYK_SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("DYK_MAIL_FROM").unwrap_or(defaults.smtp.from_email),
            from_name: env::var("DYK_MAIL_FROM_NAME").unwrap_or(defaults.smtp.from_name),
        };

        let config = ServiceConfig {
            db_path: env::var("DYK_DB_PATH").unwrap_or(defaults.db_path),

            order_timeout_secs: env::var("DYK_ORDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DYK_ORDER_TIMEOUT_SECS".to_string()))?,

            site_url: env::var("DYK_SITE_URL").unwrap_or(defaults.site_url),

            smtp,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks combinations that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.order_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("DYK_ORDER_TIMEOUT_SECS".to_string()));
        }

        if self.smtp.enabled {
            if self.smtp.host.trim().is_empty() {
                return Err(ConfigError::MissingRequired("DYK_SMTP_HOST".to_string()));
            }
            if self.smtp.user.trim().is_empty() {
                return Err(ConfigError::MissingRequired("DYK_SMTP_USER".to_string()));
            }
        }

        Ok(())
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.order_timeout_secs)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.order_timeout(), Duration::from_secs(30));
        assert_eq!(config.smtp.port, 587);
    }

    #[test]
    fn test_smtp_requires_host_and_user() {
        let mut config = ServiceConfig::default();
        config.smtp.enabled = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(key)) if key == "DYK_SMTP_USER"
        ));

        config.smtp.user = "mailer".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ServiceConfig {
            order_timeout_secs: 0,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
    }
}
