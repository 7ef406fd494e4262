use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} tidak ditemukan di environment")]
    Missing(&'static str),

    #[error("nilai {name} tidak valid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the process environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Lifetime of the session token and its cookie, in seconds.
    pub jwt_expires_secs: i64,
    pub cookie_secure: bool,
    pub frontend_url: String,
    /// Built SPA to serve for non-API paths, if any.
    pub static_dir: Option<String>,
    /// Feedback e-mail; off unless sender and recipient are set.
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
}

impl MailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(sender_email), Some(sender_password), Some(recipient_email)) = (
            optional("SENDER_EMAIL"),
            optional("SENDER_PASSWORD"),
            optional("FEEDBACK_RECIPIENT_EMAIL"),
        ) else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_server: optional("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: parsed("SMTP_PORT", 587)?,
            sender_email,
            sender_password,
            recipient_email,
        }))
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string()),
            jwt_secret: required("JWT_SECRET_KEY")?,
            jwt_expires_secs: parsed("JWT_ACCESS_TOKEN_EXPIRES", 3600)?,
            cookie_secure: parsed("JWT_COOKIE_SECURE", false)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            static_dir: optional("STATIC_DIR"),
            mail: MailConfig::from_env()?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_value(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    let normalized = match value.trim() {
        "1" if name == "JWT_COOKIE_SECURE" => "true",
        "0" if name == "JWT_COOKIE_SECURE" => "false",
        other => other,
    };

    normalized.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
