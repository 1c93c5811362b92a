//! Retry policies for layout persistence.
//!
//! Delays use fixed formulas (no jitter) so tests can predict exactly when a
//! retry is due.
//!
//! ```
//! use dashgrid_runtime::retry::{BackoffStrategy, RetryPolicy};
//! use web_time::Duration;
//!
//! let policy = RetryPolicy::persistence_default();
//! assert_eq!(policy.max_retries, 3);
//! assert_eq!(policy.delay(0), Duration::from_millis(1000));
//! assert_eq!(policy.delay(2), Duration::from_millis(4000));
//! ```

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^retry`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

/// How often, and how far apart, a failed save is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt (0 = never retry).
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::persistence_default()
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Three retries at 1s, 2s, 4s.
    pub fn persistence_default() -> Self {
        Self::new(
            3,
            BackoffStrategy::Exponential {
                base_ms: 1000,
                max_ms: 60_000,
            },
        )
    }

    /// Give up after the first failure.
    pub fn no_retry() -> Self {
        Self::new(0, BackoffStrategy::Fixed { delay_ms: 0 })
    }

    /// Delay before retry number `retry` (0-indexed).
    pub fn delay(&self, retry: u32) -> Duration {
        match &self.backoff {
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            BackoffStrategy::Exponential { base_ms, max_ms } => {
                let multiplier = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
                Duration::from_millis(base_ms.saturating_mul(multiplier).min(*max_ms))
            }
        }
    }

    /// Sum of every retry delay: the longest a save can stay pending.
    pub fn total_max_delay(&self) -> Duration {
        (0..self.max_retries).map(|retry| self.delay(retry)).sum()
    }
}
