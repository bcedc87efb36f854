use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;

struct Record {
    value: String,
    // None when the TTL reaches past what the clock can represent
    expires_at: Option<Instant>,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Process-local store used for simulation and tests.
///
/// Expiry is measured on tokio's clock, so a runtime with a paused clock
/// drives lease expiry deterministically. Share one instance between
/// candidates through an `Arc`.
pub struct InMemoryStore {
    // Map of key -> record; expired records are dropped lazily
    records: Mutex<HashMap<String, Record>>,
    available: AtomicBool,
    operations: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            operations: AtomicU64::new(0),
        }
    }

    /// Simulate an outage. While unavailable every operation fails with
    /// [`StoreError::Unavailable`] and leaves the records untouched.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of operations issued against this store, failed ones included.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// Current live holder of `key`. Not counted as an operation.
    pub fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.records()
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.value.clone())
    }

    /// Drop the record for `key` as if its TTL had elapsed.
    pub fn expire_now(&self, key: &str) -> bool {
        self.records().remove(key).is_some()
    }

    fn begin(&self) -> Result<MutexGuard<'_, HashMap<String, Record>>, StoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(self.records())
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for InMemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut records = self.begin()?;
        let now = Instant::now();

        if records.get(key).is_some_and(|record| record.is_live(now)) {
            return Ok(false);
        }

        records.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(true)
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut records = self.begin()?;
        let now = Instant::now();

        match records.get_mut(key) {
            Some(record) if record.is_live(now) => {
                record.expires_at = now.checked_add(ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let records = self.begin()?;
        let now = Instant::now();

        Ok(records
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.value.clone()))
    }

    async fn refresh_if_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        // Check and refresh under one lock acquisition
        let mut records = self.begin()?;
        let now = Instant::now();

        match records.get_mut(key) {
            Some(record) if record.is_live(now) && record.value == holder => {
                record.expires_at = now.checked_add(ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
