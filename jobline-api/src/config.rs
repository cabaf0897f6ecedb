//! API configuration
//!
//! Connection settings shared with the worker plus the HTTP bind address and
//! the retry ceiling stamped onto new jobs.

use anyhow::{Context, Result};
use jobline_core::domain::job::DEFAULT_MAX_RETRIES;
use jobline_store::ConnectionConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the Job Store and Work Queue live
    pub connection: ConnectionConfig,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// `max_retries` given to every enqueued job
    pub default_max_retries: u32,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Environment variables (all optional):
    /// - POSTGRES_URL, REDIS_ADDR, QUEUE_NAME (see `ConnectionConfig`)
    /// - API_BIND_ADDR (default: 0.0.0.0:8080)
    /// - DEFAULT_MAX_RETRIES (default: 3)
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let default_max_retries = match std::env::var("DEFAULT_MAX_RETRIES") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("DEFAULT_MAX_RETRIES is not a number: {}", raw))?,
            Err(_) => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            connection: ConnectionConfig::from_env(),
            bind_addr,
            default_max_retries,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.connection.validate().map_err(anyhow::Error::msg)?;

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            bind_addr: "0.0.0.0:8080".to_string(),
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.default_max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_bind_addr_rejected() {
        let config = Config {
            bind_addr: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
