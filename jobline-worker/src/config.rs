//! Worker configuration
//!
//! Defines the attempt deadline, the retry backoff unit and the optional
//! stale job sweep, on top of the shared connection settings.

use anyhow::{Context, Result};
use jobline_store::ConnectionConfig;
use std::time::Duration;

use crate::scheduler::worker::DEFAULT_DEADLINE_GRACE;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the Job Store and Work Queue live
    pub connection: ConnectionConfig,

    /// Deadline of a single execution attempt
    pub job_timeout: Duration,

    /// How long an attempt may overrun its deadline before it is abandoned
    pub deadline_grace: Duration,

    /// The nth retry waits n times this long before the id is requeued
    pub retry_backoff: Duration,

    /// Jobs `running` without a write for this long are requeued.
    /// `None` disables the sweep.
    pub stale_job_after: Option<Duration>,

    /// How often the stale job sweep runs
    pub sweep_interval: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Environment variables (all optional):
    /// - POSTGRES_URL, REDIS_ADDR, QUEUE_NAME (see `ConnectionConfig`)
    /// - JOB_TIMEOUT_SECS (default: 3)
    /// - DEADLINE_GRACE_MS (default: 500)
    /// - RETRY_BACKOFF_SECS (default: 1)
    /// - STALE_JOB_SECS (default: unset, sweep disabled)
    /// - SWEEP_INTERVAL_SECS (default: 30)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            connection: ConnectionConfig::from_env(),
            job_timeout: env_secs("JOB_TIMEOUT_SECS")?.unwrap_or(defaults.job_timeout),
            deadline_grace: env_millis("DEADLINE_GRACE_MS")?.unwrap_or(defaults.deadline_grace),
            retry_backoff: env_secs("RETRY_BACKOFF_SECS")?.unwrap_or(defaults.retry_backoff),
            stale_job_after: env_secs("STALE_JOB_SECS")?,
            sweep_interval: env_secs("SWEEP_INTERVAL_SECS")?.unwrap_or(defaults.sweep_interval),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.connection.validate().map_err(anyhow::Error::msg)?;

        if self.job_timeout.is_zero() {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if let Some(stale_after) = self.stale_job_after {
            if self.sweep_interval.is_zero() {
                anyhow::bail!("sweep_interval must be greater than 0");
            }

            // Backoff is covered by lease refreshes; a running attempt is not
            let longest_attempt = self.job_timeout + self.deadline_grace;
            if stale_after <= longest_attempt {
                anyhow::bail!(
                    "stale_job_after ({:?}) must exceed job_timeout plus deadline_grace ({:?})",
                    stale_after,
                    longest_attempt
                );
            }
        }

        Ok(())
    }

    /// How often a job in retry backoff rewrites its record, when the sweep is on
    pub fn lease_refresh(&self) -> Option<Duration> {
        self.stale_job_after.map(|stale_after| stale_after / 2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            job_timeout: Duration::from_secs(3),
            deadline_grace: DEFAULT_DEADLINE_GRACE,
            retry_backoff: Duration::from_secs(1),
            stale_job_after: None,
            sweep_interval: Duration::from_secs(30),
        }
    }
}

/// Reads a whole number of seconds, `None` when the variable is unset
fn env_secs(key: &str) -> Result<Option<Duration>> {
    env_number(key, "seconds").map(|value| value.map(Duration::from_secs))
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    env_number(key, "milliseconds").map(|value| value.map(Duration::from_millis))
}

fn env_number(key: &str, unit: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{} must be a whole number of {}, got '{}'", key, unit, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.job_timeout, Duration::from_secs(3));
        assert_eq!(config.retry_backoff, Duration::from_secs(1));
        assert_eq!(config.stale_job_after, None);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.job_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.job_timeout = Duration::from_secs(3);

        // A 3s attempt plus 500ms grace would already look stale at 3s
        config.stale_job_after = Some(Duration::from_secs(3));
        assert!(config.validate().is_err());

        config.stale_job_after = Some(Duration::from_secs(4));
        assert!(config.validate().is_ok());

        config.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lease_refresh_follows_stale_threshold() {
        let mut config = Config::default();
        assert_eq!(config.deadline_grace, Duration::from_millis(500));
        assert_eq!(config.lease_refresh(), None);

        // Long retry budgets no longer matter: the refresh is what keeps a
        // backing-off job fresh, and it always fires inside the threshold
        config.stale_job_after = Some(Duration::from_secs(10));
        config.retry_backoff = Duration::from_secs(5);
        assert!(config.validate().is_ok());
        assert_eq!(config.lease_refresh(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_unset_variable_reads_as_none() {
        assert!(
            env_secs("JOBLINE_TEST_VARIABLE_THAT_IS_NEVER_SET")
                .unwrap()
                .is_none()
        );
    }
}
