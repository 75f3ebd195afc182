use crate::server::Linger;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub linger: Linger,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let linger = match std::env::var("PEER_LINGER_MS") {
            Ok(raw) if raw.eq_ignore_ascii_case("forever") => Linger::Forever,
            Ok(raw) => raw
                .parse::<u64>()
                .map(|ms| Linger::For(Duration::from_millis(ms)))
                .map_err(|e| ConfigError::InvalidValue("PEER_LINGER_MS".to_string(), e.to_string()))?,
            Err(_) => Linger::Immediate,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            linger,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("PEER_LINGER_MS");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:3000");
        assert_eq!(config.linger, Linger::Immediate);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "0.0.0.0:8080");
            env::set_var("PEER_LINGER_MS", "1500");
            env::set_var("RUST_LOG", "trace");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.linger, Linger::For(Duration::from_millis(1500)));
        assert_eq!(config.log_level, Level::TRACE);
    }

    #[test]
    #[serial]
    fn test_config_linger_forever() {
        clear_env_vars();
        unsafe {
            env::set_var("PEER_LINGER_MS", "Forever");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.linger, Linger::Forever);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "BIND_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_config_invalid_linger() {
        clear_env_vars();
        unsafe {
            env::set_var("PEER_LINGER_MS", "-5");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "PEER_LINGER_MS");
    }
}
