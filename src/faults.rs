//! Simulated packet loss and latency.
//!
//! Each response gets two independent draws: one deciding whether it is
//! dropped, and one picking its delay from `[base, base + jitter)`.

use rand::Rng;
use std::time::Duration;

/// Default additive delay in milliseconds
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Default delay jitter in milliseconds
pub const DEFAULT_JITTER_MS: u64 = 1000;

/// What to do with a computed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Discard the response
    Drop,
    /// Send the response after the delay
    Deliver(Duration),
}

/// Drop and delay policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultInjector {
    /// Fraction of responses delivered; a draw above it drops
    threshold: f64,
    base_delay: Duration,
    jitter: Duration,
}

impl FaultInjector {
    pub fn new(threshold: f64, base_delay: Duration, jitter: Duration) -> Self {
        FaultInjector {
            threshold,
            base_delay,
            jitter,
        }
    }

    /// Decide the fate of one response.
    pub fn decide<R: Rng + ?Sized>(&self, rng: &mut R) -> Verdict {
        let draw: f64 = rng.gen();
        if draw > self.threshold {
            return Verdict::Drop;
        }

        Verdict::Deliver(self.delay(rng))
    }

    /// Draw a delay uniformly from `[base, base + jitter)`.
    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.jitter.is_zero() {
            return self.base_delay;
        }
        self.base_delay + rng.gen_range(Duration::ZERO..self.jitter)
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        FaultInjector::new(
            crate::config::DEFAULT_THRESHOLD,
            Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            Duration::from_millis(DEFAULT_JITTER_MS),
        )
    }
}
