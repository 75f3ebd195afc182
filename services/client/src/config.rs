use countdown_core::{DEFAULT_CLOSE_AFTER, FIXED_SOCKET_URL};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Page location the render variant derives its socket address from.
    pub page_url: Url,
    /// Address used by the farewell variant.
    pub socket_url: Url,
    pub close_after: Duration,
    pub cancel_timer_on_close: bool,
    /// File the render variant mirrors the document to.
    pub render_path: Option<PathBuf>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let page_url = parse_url("PAGE_URL", "http://localhost:3000/")?;
        let socket_url = parse_url("SOCKET_URL", FIXED_SOCKET_URL)?;

        let close_after = match std::env::var("CLOSE_AFTER_MS") {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|e| {
                ConfigError::InvalidValue("CLOSE_AFTER_MS".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_CLOSE_AFTER,
        };

        let cancel_timer_on_close = match std::env::var("CANCEL_TIMER_ON_CLOSE") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CANCEL_TIMER_ON_CLOSE".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
            Err(_) => false,
        };

        let render_path = std::env::var("RENDER_PATH").ok().map(PathBuf::from);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            page_url,
            socket_url,
            close_after,
            cancel_timer_on_close,
            render_path,
            log_level,
        })
    }
}

fn parse_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
