//! Retry and backoff policies
//!
//! Two separate clocks: [`RetryPolicy`] spends a job's retry budget after
//! execution failures, [`InfraBackoff`] slows the loop down while the queue
//! or store is unreachable. Infrastructure faults never touch the budget.

use std::time::Duration;

/// What to do with a job after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Persist `retries`, wait `backoff`, then put the id back on the queue
    Retry { retries: u32, backoff: Duration },
    /// Budget exhausted; persist `retries` and mark the job failed
    Terminal { retries: u32 },
}

/// Linear job-level backoff: the nth retry waits `n * backoff_unit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(backoff_unit: Duration) -> Self {
        Self { backoff_unit }
    }

    pub fn backoff_for(&self, retries: u32) -> Duration {
        self.backoff_unit.saturating_mul(retries)
    }

    /// Decides the fate of a job whose attempt just failed
    ///
    /// `retries` is the count persisted before this attempt; the decision
    /// carries the incremented value.
    pub fn decide(&self, retries: u32, max_retries: u32) -> RetryDecision {
        let retries = retries.saturating_add(1);
        if retries >= max_retries {
            RetryDecision::Terminal { retries }
        } else {
            RetryDecision::Retry {
                retries,
                backoff: self.backoff_for(retries),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Exponential delay between attempts to reach a failing queue or store
#[derive(Debug, Clone)]
pub struct InfraBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl InfraBackoff {
    const INITIAL_DELAY: Duration = Duration::from_millis(100);
    const MAX_DELAY: Duration = Duration::from_secs(30);

    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to wait now and doubles the next one, up to the cap
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Back to the initial delay after a clean iteration
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for InfraBackoff {
    fn default() -> Self {
        Self::new(Self::INITIAL_DELAY, Self::MAX_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(Duration::from_secs(1));
        assert_eq!(policy.backoff_for(0), Duration::ZERO);
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(5), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_is_monotonic() {
        let policy = RetryPolicy::new(Duration::from_millis(250));
        let delays: Vec<Duration> = (0..50).map(|n| policy.backoff_for(n)).collect();
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_decide_retries_until_budget_is_spent() {
        let policy = RetryPolicy::new(Duration::from_secs(1));

        assert_eq!(
            policy.decide(0, 3),
            RetryDecision::Retry {
                retries: 1,
                backoff: Duration::from_secs(1)
            }
        );
        assert_eq!(
            policy.decide(1, 3),
            RetryDecision::Retry {
                retries: 2,
                backoff: Duration::from_secs(2)
            }
        );
        assert_eq!(policy.decide(2, 3), RetryDecision::Terminal { retries: 3 });
    }

    #[test]
    fn test_decide_with_no_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.decide(0, 0), RetryDecision::Terminal { retries: 1 });
        assert_eq!(policy.decide(0, 1), RetryDecision::Terminal { retries: 1 });
    }

    #[test]
    fn test_infra_backoff_doubles_and_caps() {
        let mut backoff = InfraBackoff::new(Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_infra_backoff_defaults() {
        let mut backoff = InfraBackoff::default();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        for _ in 0..20 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(30));
    }
}
