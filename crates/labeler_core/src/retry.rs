use std::time::Duration;

use crate::FailureCategory;

/// Backoff schedule for failed classification attempts.
///
/// There is no retry ceiling: every category maps to a wait and the caller
/// always tries again. Rate limiting grows linearly with the attempt number up
/// to `rate_limit_cap`; every other category waits a fixed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rate_limit_step: Duration,
    pub rate_limit_cap: Duration,
    pub quota_wait: Duration,
    pub transient_wait: Duration,
    pub invalid_output_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_step: Duration::from_secs(5),
            rate_limit_cap: Duration::from_secs(60),
            quota_wait: Duration::from_secs(30),
            transient_wait: Duration::from_secs(10),
            invalid_output_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt. `attempt` is the 1-based number of the
    /// attempt that just failed.
    pub fn backoff(&self, category: FailureCategory, attempt: u32) -> Duration {
        match category {
            FailureCategory::RateLimited => self
                .rate_limit_step
                .saturating_mul(attempt.max(1))
                .min(self.rate_limit_cap),
            FailureCategory::QuotaExceeded => self.quota_wait,
            FailureCategory::TransientOther => self.transient_wait,
            FailureCategory::InvalidOutput => self.invalid_output_wait,
        }
    }
}
