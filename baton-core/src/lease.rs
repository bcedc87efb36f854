//! Lease primitive: the three calls an election makes against the store,
//! each turned into a typed outcome.

use std::time::Duration;

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;
use crate::types::{AcquireOutcome, RenewOutcome};

/// A time-bound ownership record for one election key.
///
/// There is deliberately no release call. A leader that is done simply
/// stops renewing and the store expires the record, so for up to one TTL a
/// relinquished lease and a lease whose holder has crashed look the same to
/// everyone else. Deleting on relinquish would shorten handoff but change
/// that staleness guarantee.
pub struct Lease {
    store: Box<dyn CoordinationStore>,
    key: String,
    ttl: Duration,
}

impl Lease {
    pub fn new(store: Box<dyn CoordinationStore>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Conditionally write `candidate_id` as holder. Only succeeds when no
    /// live record exists.
    pub async fn try_acquire(&self, candidate_id: &str) -> AcquireOutcome {
        match self.store.set_if_absent(&self.key, candidate_id, self.ttl).await {
            Ok(true) => AcquireOutcome::Acquired,
            Ok(false) => AcquireOutcome::Contended,
            Err(e) => AcquireOutcome::StoreError(e),
        }
    }

    /// Push the expiry out by one TTL, provided `candidate_id` still holds
    /// the record.
    pub async fn renew(&self, candidate_id: &str) -> RenewOutcome {
        match self
            .store
            .refresh_if_holder(&self.key, candidate_id, self.ttl)
            .await
        {
            Ok(true) => RenewOutcome::Renewed,
            Ok(false) => RenewOutcome::NotHolder,
            Err(e) => RenewOutcome::StoreError(e),
        }
    }

    /// Current holder, for diagnostics only. Never decide ownership on this:
    /// two candidates can both read "absent" and both believe they may write.
    pub async fn read_holder(&self) -> Result<Option<String>, StoreError> {
        self.store.get_value(&self.key).await
    }
}
