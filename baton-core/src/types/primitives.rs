use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Where a candidate is in its election cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateState {
    /// Not holding the lease; waiting out a backoff or between cycles
    Idle,
    /// A conditional acquisition is in flight
    Attempting,
    /// Holding the lease; work and renewal are running
    Leading,
}

impl std::fmt::Display for CandidateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateState::Idle => write!(f, "IDLE"),
            CandidateState::Attempting => write!(f, "ATTEMPTING"),
            CandidateState::Leading => write!(f, "LEADING"),
        }
    }
}

/// Snapshot of a candidate, published on every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateStatus {
    pub id: String,
    pub state: CandidateState,
    /// Wall-clock ms at which the current leadership period began
    pub leading_since: Option<u64>,
}

impl CandidateStatus {
    pub fn idle(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: CandidateState::Idle,
            leading_since: None,
        }
    }
}

/// Why a leader stopped leading without choosing to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// The store names another holder, or no holder at all
    NotHolder,
    /// A renewal could not reach the store
    StoreError(String),
}

/// How a leadership period ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodEnd {
    /// The work budget ran out. The record is left to expire on its own.
    Relinquished,
    /// Renewal detected that the lease is no longer ours.
    LeaseLost(LossReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Elected,
    Relinquished,
    LeaseLost { reason: LossReason },
    Stopped,
}

impl From<PeriodEnd> for EventKind {
    fn from(end: PeriodEnd) -> Self {
        match end {
            PeriodEnd::Relinquished => EventKind::Relinquished,
            PeriodEnd::LeaseLost(reason) => EventKind::LeaseLost { reason },
        }
    }
}

/// A leadership transition reported by a candidate.
#[derive(Debug, Clone)]
pub struct ElectionEvent {
    pub candidate_id: String,
    pub kind: EventKind,
    /// Monotonic instant of the transition (follows tokio's paused clock in tests)
    pub at: Instant,
}
