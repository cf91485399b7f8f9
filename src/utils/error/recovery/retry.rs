//! Backoff strategies for bounded retries

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay strategy applied between retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `base * 2^attempt`
    #[default]
    Exponential,
    /// `base * (attempt + 1)`
    Linear,
    /// No delay
    Immediate,
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (zero-based), capped at `max_delay`
    pub fn delay(&self, attempt: u32, base: Duration, max_delay: Duration) -> Duration {
        let delay = match self {
            BackoffStrategy::Exponential => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            BackoffStrategy::Linear => base.saturating_mul(attempt.saturating_add(1)),
            BackoffStrategy::Immediate => Duration::ZERO,
        };
        delay.min(max_delay)
    }
}
