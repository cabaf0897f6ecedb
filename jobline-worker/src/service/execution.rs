//! Execution service
//!
//! Runs the unit of work behind a job's payload under a per-attempt deadline.
//! Strategies are trait objects so real task dispatch can replace the
//! simulation without touching the worker loop.

use async_trait::async_trait;
use jobline_core::domain::job::TIMEOUT_MESSAGE_PREFIX;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellation scope of a single attempt
///
/// The token is cancelled as soon as anyone observes the deadline passing,
/// so strategies can either race [`Deadline::expired`] or poll
/// [`Deadline::is_expired`] between steps.
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancellationToken,
    at: Instant,
    window: Duration,
}

impl Deadline {
    /// Starts a window that closes `window` from now
    pub fn after(window: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            at: Instant::now() + window,
            window,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.at
    }

    /// Closes the window early
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the window has closed, cancelling the token if the
    /// clock got there first
    pub async fn expired(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.at) => self.token.cancel(),
        }
    }

    /// The failure reported by an attempt that ran out of time
    pub fn timed_out(&self) -> ExecutionFailure {
        ExecutionFailure::TimedOut(self.window)
    }
}

/// Why an attempt failed. The `Display` text is what gets persisted as the
/// job's `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    /// The payload is not a JSON string
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The work itself reported an error
    #[error("{0}")]
    Failed(String),

    /// The deadline fired before the work finished
    #[error("{}: deadline exceeded after {:?}", TIMEOUT_MESSAGE_PREFIX, .0)]
    TimedOut(Duration),
}

impl ExecutionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// Performs the work for one job payload
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Runs the work described by `payload` (raw JSON text)
    ///
    /// Implementations must return [`ExecutionFailure::TimedOut`] promptly
    /// once `deadline` expires instead of hanging past it.
    async fn execute(&self, payload: &str, deadline: &Deadline) -> Result<(), ExecutionFailure>;
}

/// Decodes the payload column into the string it carries
pub fn decode_payload(payload: &str) -> Result<String, ExecutionFailure> {
    match serde_json::from_str::<JsonValue>(payload) {
        Ok(JsonValue::String(data)) => Ok(data),
        Ok(other) => Err(ExecutionFailure::InvalidPayload(format!(
            "expected a JSON string, got {}",
            other
        ))),
        Err(e) => Err(ExecutionFailure::InvalidPayload(e.to_string())),
    }
}

/// Stand-in for real task dispatch
///
/// `"fail"` fails immediately, `"slow"` sleeps for `slow` (longer than the
/// default deadline) and everything else sleeps for `quick` and succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedExecution {
    quick: Duration,
    slow: Duration,
}

impl SimulatedExecution {
    pub fn new(quick: Duration, slow: Duration) -> Self {
        Self { quick, slow }
    }

    async fn simulate_work(
        &self,
        duration: Duration,
        deadline: &Deadline,
    ) -> Result<(), ExecutionFailure> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = deadline.expired() => Err(deadline.timed_out()),
        }
    }
}

impl Default for SimulatedExecution {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5))
    }
}

#[async_trait]
impl ExecutionStrategy for SimulatedExecution {
    async fn execute(&self, payload: &str, deadline: &Deadline) -> Result<(), ExecutionFailure> {
        let data = decode_payload(payload)?;
        debug!("Simulating work for payload '{}'", data);

        match data.as_str() {
            "fail" => Err(ExecutionFailure::Failed(format!(
                "simulated failure for payload: {}",
                data
            ))),
            "slow" => self.simulate_work(self.slow, deadline).await,
            _ => self.simulate_work(self.quick, deadline).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_strategy() -> SimulatedExecution {
        SimulatedExecution::new(Duration::from_millis(5), Duration::from_millis(500))
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload("\"send_email\"").unwrap(), "send_email");
        assert_eq!(decode_payload("\"\"").unwrap(), "");
    }

    #[test]
    fn test_decode_payload_rejects_non_strings() {
        for payload in ["42", "{\"a\":1}", "null", "not json", ""] {
            let err = decode_payload(payload).unwrap_err();
            assert!(
                err.to_string().starts_with("invalid payload: "),
                "payload {:?} gave {}",
                payload,
                err
            );
        }
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            ExecutionFailure::Failed("simulated failure for payload: fail".to_string()).to_string(),
            "simulated failure for payload: fail"
        );

        let timeout = ExecutionFailure::TimedOut(Duration::from_secs(3));
        assert!(timeout.is_timeout());
        assert_eq!(
            timeout.to_string(),
            "job timed out: deadline exceeded after 3s"
        );
    }

    #[tokio::test]
    async fn test_quick_payload_succeeds() {
        let deadline = Deadline::after(Duration::from_millis(200));
        assert!(fast_strategy().execute("\"hello\"", &deadline).await.is_ok());
        assert!(!deadline.is_expired());
    }

    #[tokio::test]
    async fn test_fail_payload() {
        let deadline = Deadline::after(Duration::from_millis(200));
        let err = fast_strategy().execute("\"fail\"", &deadline).await.unwrap_err();
        assert_eq!(
            err,
            ExecutionFailure::Failed("simulated failure for payload: fail".to_string())
        );
    }

    #[tokio::test]
    async fn test_slow_payload_times_out_promptly() {
        let deadline = Deadline::after(Duration::from_millis(30));
        let started = std::time::Instant::now();

        let err = fast_strategy().execute("\"slow\"", &deadline).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().starts_with(TIMEOUT_MESSAGE_PREFIX));
        assert!(deadline.is_expired());
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_cancelled_deadline_stops_work() {
        let deadline = Deadline::after(Duration::from_secs(10));
        deadline.cancel();

        let err = fast_strategy().execute("\"slow\"", &deadline).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_invalid_payload_is_a_failure() {
        let deadline = Deadline::after(Duration::from_millis(200));
        let err = fast_strategy().execute("42", &deadline).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::InvalidPayload(_)));
    }
}
