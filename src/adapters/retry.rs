//! Central retry/backoff policy for provider calls.
//!
//! One policy object is injected into the metrics client instead of ad hoc
//! retry loops at each call site. The policy decides, per response status,
//! whether a unit of work is retried (and after how long) or abandoned.

use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// What to do with a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay
    RetryAfter(Duration),
    /// Do not retry; log and skip this unit of work
    Abandon,
}

/// Bounded exponential backoff with Retry-After support
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per unit of work, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that
    pub base_delay: Duration,
    /// Jitter fraction applied to computed backoff (0.0 disables)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            jitter: 0.1,
        }
    }

    /// Backoff before retrying attempt `attempt` (0-based index of the
    /// attempt that just failed): base, 2x base, 4x base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    fn with_jitter(&self, d: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return d;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(-self.jitter..self.jitter);
        d.mul_f64(factor.max(0.0))
    }

    /// Decide what to do after a failed attempt.
    ///
    /// - 429: honor Retry-After when the provider sent one, else backoff
    /// - 5xx: backoff
    /// - any other 4xx: abandon the unit of work
    pub fn decide(
        &self,
        status: StatusCode,
        retry_after: Option<Duration>,
        attempt: u32,
    ) -> RetryDecision {
        if attempt + 1 >= self.max_attempts {
            return RetryDecision::Abandon;
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let delay = retry_after.unwrap_or_else(|| self.backoff(attempt));
            return RetryDecision::RetryAfter(self.with_jitter(delay));
        }

        if status.is_server_error() {
            return RetryDecision::RetryAfter(self.with_jitter(self.backoff(attempt)));
        }

        RetryDecision::Abandon
    }

    /// Connection-level failures (no status) are treated like 5xx.
    pub fn decide_transport(&self, attempt: u32) -> RetryDecision {
        if attempt + 1 >= self.max_attempts {
            return RetryDecision::Abandon;
        }
        RetryDecision::RetryAfter(self.with_jitter(self.backoff(attempt)))
    }
}
