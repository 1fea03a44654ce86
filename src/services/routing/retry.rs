//! Retry policy for directions requests
//!
//! Each attempt's outcome is fed through `RetryPolicy::decide`, which turns it
//! into one of three next steps. Keeping the decision pure means the schedule
//! and the error classification are testable without timers or network.

use std::time::Duration;

use crate::defaults::{default_retry_base_delay, default_retry_max_delay, DEFAULT_MAX_RETRIES};
use crate::error::RoutingError;
use crate::types::ProviderRoute;

/// Exponential backoff settings
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: default_retry_base_delay(),
            max_delay: default_retry_max_delay(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// What to do after an attempt
#[derive(Debug)]
pub enum Decision {
    /// Provider answered with a usable route
    Done(ProviderRoute),
    /// Wait `delay`, then attempt again
    Retry { delay: Duration, error: RoutingError },
    /// Stop trying and serve the straight-line estimate
    FallBack(RoutingError),
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 2u32.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Classify the outcome of attempt number `attempt` (1-based)
    pub fn decide(&self, attempt: u32, outcome: Result<ProviderRoute, RoutingError>) -> Decision {
        match outcome {
            Ok(route) => Decision::Done(route),
            Err(error) if error.is_retryable() && attempt <= self.max_retries => Decision::Retry {
                delay: self.delay_for(attempt),
                error,
            },
            Err(error) => Decision::FallBack(error),
        }
    }
}
