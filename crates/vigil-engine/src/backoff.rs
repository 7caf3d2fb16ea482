//! Reconnect backoff
//!
//! Exponential: `initial * 2^(failures-1)`, capped at `max`. A session that
//! reached `Connected` resets the sequence.

use std::time::Duration;

use vigil_store::config::BackoffConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            failures: 0,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_ms),
            Duration::from_millis(config.max_ms),
        )
    }

    /// Delay before the next attempt; counts one more consecutive failure.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let multiplier = 2u32.saturating_pow(self.failures - 1);
        self.initial.saturating_mul(multiplier).min(self.max)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
