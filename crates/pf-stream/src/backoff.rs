//! Reconnect backoff.
//!
//! The delay after the Nth consecutive failed connection cycle is
//! `min(base * 2^(N-1), cap)`. A successful open resets N to zero.

use std::time::Duration;

use pf_core::config::FeedConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap, failures: 0 }
    }

    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self::new(cfg.base_delay(), cfg.max_delay())
    }

    /// Count one more failed cycle and return the delay before the next attempt.
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay_for(self.failures)
    }

    /// Delay after `n` consecutive failures (`n == 0` → no delay).
    pub fn delay_for(&self, n: u32) -> Duration {
        if n == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(n - 1).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).map_or(self.cap, |d| d.min(self.cap))
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
