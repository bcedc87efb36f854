use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Defines the contract for coordination store backends.
///
/// Mutual exclusion rests entirely on `set_if_absent` being atomic in the
/// backend: two callers racing on an absent key must not both see `true`.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Write `value` under `key` with `ttl`, only if no live record exists.
    /// Returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, StoreError>;

    /// Reset the expiry of a live record regardless of its value.
    /// Returns whether a live record existed.
    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Read the value of a live record.
    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Reset the expiry only if the live record's value is `holder`.
    ///
    /// The provided implementation reads, then refreshes. Between the two
    /// calls the record can expire and be taken over, in which case the new
    /// holder's record is the one refreshed. Backends with a conditional
    /// refresh must override this to close that window.
    async fn refresh_if_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        match self.get_value(key).await? {
            Some(current) if current == holder => self.refresh_ttl(key, ttl).await,
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl<S: CoordinationStore + ?Sized> CoordinationStore for Arc<S> {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        (**self).set_if_absent(key, value, ttl).await
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        (**self).refresh_ttl(key, ttl).await
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_value(key).await
    }

    async fn refresh_if_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        (**self).refresh_if_holder(key, holder, ttl).await
    }
}
