use thiserror::Error;

/// Failures talking to the coordination store.
///
/// None of these are fatal to a candidate: an acquisition attempt that hits
/// one backs off and retries, a renewal that hits one ends the leadership
/// period.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("coordination store unavailable")]
    Unavailable,

    /// The store answered with something the backend could not interpret.
    #[error("coordination store error: {0}")]
    Backend(String),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors surfaced by the election engine itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElectionError {
    /// Rejected at construction time, before any candidate runs.
    #[error("invalid election config: {0}")]
    InvalidConfig(String),

    /// The shutdown token fired while a candidate was suspended.
    #[error("election cancelled")]
    Cancelled,
}
