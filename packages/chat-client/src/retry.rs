//! Retry policy for chat requests.
//!
//! Long-running completions are frequently throttled. Requests are retried
//! with capped exponential backoff; in adaptive mode the wait also honours
//! the provider's `Retry-After` and is spread with jitter so concurrent
//! callers do not retry in lockstep.

use std::time::Duration;

use crate::error::ChatError;

/// How failed requests are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Honour `Retry-After` and add jitter
    pub adaptive: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            adaptive: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed with `error`.
    pub fn should_retry(&self, attempt: u32, error: &ChatError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Backoff before the attempt following `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay to wait after `attempt` failed with `error`.
    pub fn delay_for(&self, attempt: u32, error: &ChatError) -> Duration {
        let backoff = self.backoff(attempt);
        if !self.adaptive {
            return backoff;
        }

        let base = match error.retry_after() {
            Some(requested) if requested > backoff => requested,
            _ => backoff,
        };

        // Up to 25% jitter
        let jitter_ms = (base.as_millis() as u64) / 4;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(fastrand::u64(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        base + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttled(retry_after: Option<Duration>) -> ChatError {
        ChatError::Api {
            status: 429,
            message: "Too many requests".into(),
            retry_after,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert!(policy.adaptive);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(10));

        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(5), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_should_retry_respects_attempt_budget() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        let err = throttled(None);

        assert!(policy.should_retry(1, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
    }

    #[test]
    fn test_should_not_retry_client_errors() {
        let policy = RetryPolicy::default();
        let err = ChatError::Api {
            status: 400,
            message: "bad request".into(),
            retry_after: None,
        };
        assert!(!policy.should_retry(1, &err));
    }

    #[test]
    fn test_none_policy_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1, &throttled(None)));
    }

    #[test]
    fn test_fixed_mode_has_no_jitter() {
        let policy = RetryPolicy::default()
            .with_adaptive(false)
            .with_base_delay(Duration::from_millis(100));

        assert_eq!(
            policy.delay_for(2, &throttled(Some(Duration::from_secs(30)))),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_adaptive_mode_honours_retry_after() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(100));
        let delay = policy.delay_for(1, &throttled(Some(Duration::from_secs(4))));

        assert!(delay >= Duration::from_secs(4));
        assert!(delay <= Duration::from_secs(5));
    }

    #[test]
    fn test_adaptive_jitter_stays_within_quarter() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(400));

        for _ in 0..50 {
            let delay = policy.delay_for(1, &throttled(None));
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(500));
        }
    }
}
