use crate::error::StoreError;

/// Result of a single conditional acquisition attempt.
#[derive(Debug)]
pub enum AcquireOutcome {
    /// The conditional write went through; the caller now holds the lease.
    Acquired,
    /// A live record already exists. Losing a round is not an error.
    Contended,
    /// The store could not be asked.
    StoreError(StoreError),
}

impl AcquireOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired)
    }
}

/// Result of an ownership-verified lease refresh.
#[derive(Debug)]
pub enum RenewOutcome {
    /// Expiry pushed out by one TTL.
    Renewed,
    /// The record is gone or names someone else. The caller lost the lease,
    /// possibly to a candidate that took it over after our record expired.
    NotHolder,
    /// The store could not be asked.
    StoreError(StoreError),
}

impl RenewOutcome {
    pub fn is_renewed(&self) -> bool {
        matches!(self, RenewOutcome::Renewed)
    }
}
