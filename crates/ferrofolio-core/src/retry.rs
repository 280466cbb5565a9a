//! Retry policy for exchange calls, keyed by failure class.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Why an attempt failed in a way worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429 from the exchange.
    RateLimit,
    /// Connection refused, timeout or unresolved host.
    Network,
    /// The request went out but no complete response came back.
    NoResponse,
}

impl FailureClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::NoResponse => "no_response",
        }
    }
}

impl Display for FailureClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Waits `attempt * step`, where `attempt` is the 1-based attempt that failed.
    Linear {
        step: Duration,
    },
}

impl Backoff {
    pub const fn linear(step: Duration) -> Self {
        Self::Linear { step }
    }

    /// Calculate the delay after the given 1-based attempt failed.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step } => step.saturating_mul(attempt.max(1)),
        }
    }
}

/// One policy object for every retryable failure class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub rate_limit: Backoff,
    pub network: Backoff,
    pub no_response: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit: Backoff::linear(Duration::from_secs(2)),
            network: Backoff::linear(Duration::from_secs(2)),
            no_response: Backoff::linear(Duration::from_secs(3)),
        }
    }
}

impl RetryPolicy {
    /// Default backoff formulas with a custom attempt ceiling.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Single attempt, nothing retried.
    pub fn no_retry() -> Self {
        Self::with_max_attempts(1)
    }

    /// Scales every linear step to `unit`, keeping the 2/2/3 ratios.
    ///
    /// Tests use this to run the real retry loop in milliseconds.
    pub fn scaled(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts,
            rate_limit: Backoff::linear(unit.saturating_mul(2)),
            network: Backoff::linear(unit.saturating_mul(2)),
            no_response: Backoff::linear(unit.saturating_mul(3)),
        }
    }

    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn backoff_for(&self, class: FailureClass) -> Backoff {
        match class {
            FailureClass::RateLimit => self.rate_limit,
            FailureClass::Network => self.network,
            FailureClass::NoResponse => self.no_response,
        }
    }

    /// Delay to wait after `attempt` failed with `class`, or `None` when the
    /// attempt was the last one allowed.
    pub fn delay_for(&self, class: FailureClass, attempt: u32) -> Option<Duration> {
        if attempt >= self.effective_attempts() {
            return None;
        }
        Some(self.backoff_for(class).delay(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_linear_backoff() {
        let backoff = Backoff::linear(Duration::from_secs(2));

        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(6));
    }

    #[test]
    fn test_default_policy_matches_exchange_guidance() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(
            policy.delay_for(FailureClass::RateLimit, 1),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            policy.delay_for(FailureClass::Network, 2),
            Some(Duration::from_secs(4))
        );
        assert_eq!(
            policy.delay_for(FailureClass::NoResponse, 1),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            policy.delay_for(FailureClass::NoResponse, 2),
            Some(Duration::from_secs(6))
        );
    }

    #[test]
    fn test_last_attempt_never_waits() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(FailureClass::RateLimit, 3), None);
        assert_eq!(policy.delay_for(FailureClass::Network, 4), None);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.effective_attempts(), 1);
        assert_eq!(policy.delay_for(FailureClass::RateLimit, 1), None);
    }

    #[test]
    fn test_scaled_policy_keeps_ratios() {
        let policy = RetryPolicy::scaled(3, Duration::from_millis(1));
        assert_eq!(
            policy.delay_for(FailureClass::RateLimit, 2),
            Some(Duration::from_millis(4))
        );
        assert_eq!(
            policy.delay_for(FailureClass::NoResponse, 2),
            Some(Duration::from_millis(6))
        );
    }
}
