//! # baton-core
//!
//! Lease-based leader election over a shared coordination store.
//! Candidates never talk to each other: every ownership decision goes
//! through the store's atomic conditional write, leaders keep their lease
//! alive with periodic ownership-verified refreshes, and losers retry
//! after a jittered backoff.

pub mod activity;
pub mod candidate;
pub mod config;
pub mod election;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "redis")]
#[path = "infrastructure_redis.rs"]
pub mod infrastructure_redis;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod lease;
pub mod scheduler;
pub mod types;

pub use candidate::Candidate;
pub use config::ElectionConfig;
pub use election::Election;
pub use error::{ElectionError, StoreError};
pub use infrastructure::CoordinationStore;
pub use lease::Lease;

#[cfg(test)]
mod election_test;
#[cfg(test)]
mod scheduler_test;
