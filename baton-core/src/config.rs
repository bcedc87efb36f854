use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ElectionError;
use crate::scheduler::BackoffPolicy;

/// Tunables for one election. All durations are in milliseconds.
///
/// The defaults reproduce a one-second lease renewed twice per TTL, a
/// three-second leadership budget, and a 50-150ms retry window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Store key shared by every candidate of this election
    pub key: String,
    /// Lease time-to-live
    pub ttl_ms: u64,
    /// Renewal period; must be shorter than the TTL
    pub tick_interval_ms: u64,
    /// How long a leader works before relinquishing
    pub work_budget_ms: u64,
    /// How often a working leader logs that it is still leading
    pub report_interval_ms: u64,
    /// Lower bound of the retry delay after a failed acquisition
    pub min_delay_ms: u64,
    /// Width of the uniform jitter added on top of `min_delay_ms`
    pub jitter_spread_ms: u64,
    /// Seed for the backoff RNG. A candidate mixes its id into it; an
    /// `Election` gives its `i`-th candidate `seed + i` instead.
    pub seed: Option<u64>,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            key: "leader".to_string(),
            ttl_ms: 1_000,
            tick_interval_ms: 500,
            work_budget_ms: 3_000,
            report_interval_ms: 1_000,
            min_delay_ms: 50,
            jitter_spread_ms: 100,
            seed: None,
        }
    }
}

impl ElectionConfig {
    pub fn validate(&self) -> Result<(), ElectionError> {
        if self.key.is_empty() {
            return Err(ElectionError::InvalidConfig("key must not be empty".into()));
        }
        if self.ttl_ms == 0 {
            return Err(ElectionError::InvalidConfig("ttl_ms must be positive".into()));
        }
        // A tick at or past the TTL lets the lease lapse between two renewals.
        if self.tick_interval_ms == 0 || self.tick_interval_ms >= self.ttl_ms {
            return Err(ElectionError::InvalidConfig(format!(
                "tick_interval_ms ({}) must be in 1..{} (ttl_ms)",
                self.tick_interval_ms, self.ttl_ms
            )));
        }
        if self.work_budget_ms == 0 {
            return Err(ElectionError::InvalidConfig(
                "work_budget_ms must be positive".into(),
            ));
        }
        if self.report_interval_ms == 0 {
            return Err(ElectionError::InvalidConfig(
                "report_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn work_budget(&self) -> Duration {
        Duration::from_millis(self.work_budget_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.jitter_spread_ms),
        )
    }
}
