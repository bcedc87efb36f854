use std::time::Duration;

use rand::Rng;

/// Jittered retry delay between failed acquisition attempts.
///
/// Every losing candidate notices an expired lease at about the same time.
/// Drawing each delay uniformly from `[min_delay, min_delay + jitter_spread]`
/// keeps them from retrying in lockstep and colliding again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    min_delay: Duration,
    jitter_spread: Duration,
}

impl BackoffPolicy {
    pub fn new(min_delay: Duration, jitter_spread: Duration) -> Self {
        Self {
            min_delay,
            jitter_spread,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Upper bound of any delay this policy returns.
    pub fn max_delay(&self) -> Duration {
        self.min_delay + self.jitter_spread
    }

    /// Draw the next delay.
    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let spread_ms = self.jitter_spread.as_millis() as u64;
        let jitter_ms = rng.random_range(0..=spread_ms);
        self.min_delay + Duration::from_millis(jitter_ms)
    }
}
