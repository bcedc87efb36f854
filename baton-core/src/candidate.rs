//! Candidate state machine: Idle → Attempting → Leading → Idle, until the
//! shutdown token is cancelled.

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity;
use crate::config::ElectionConfig;
use crate::error::ElectionError;
use crate::infrastructure::CoordinationStore;
use crate::lease::Lease;
use crate::scheduler::BackoffPolicy;
use crate::types::{
    now_ms, AcquireOutcome, CandidateState, CandidateStatus, ElectionEvent, EventKind,
    PeriodEnd,
};

/// One election participant.
///
/// A candidate owns its store handle and shares nothing mutable with other
/// candidates. Inside a leadership period the work and renewal activities
/// share a single child cancellation token; the first to finish cancels it.
///
/// Leadership is never released explicitly. When the work budget runs out the
/// candidate stops renewing and the record expires after at most one TTL.
pub struct Candidate {
    id: String,
    lease: Lease,
    backoff: BackoffPolicy,
    rng: StdRng,
    tick_interval: Duration,
    work_budget: Duration,
    report_interval: Duration,
    state: CandidateState,
    leading_since: Option<u64>,
    status: watch::Sender<CandidateStatus>,
    events: Option<mpsc::UnboundedSender<ElectionEvent>>,
}

impl Candidate {
    /// Build a candidate for `config.key`. A `None` id generates one.
    pub fn new(
        id: Option<String>,
        store: Box<dyn CoordinationStore>,
        config: &ElectionConfig,
    ) -> Result<Self, ElectionError> {
        config.validate()?;
        let id = id.unwrap_or_else(|| nanoid::nanoid!(10));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(candidate_seed(seed, &id)),
            None => StdRng::from_os_rng(),
        };
        let (status, _) = watch::channel(CandidateStatus::idle(id.clone()));

        Ok(Self {
            lease: Lease::new(store, config.key.clone(), config.ttl()),
            backoff: config.backoff(),
            rng,
            tick_interval: config.tick_interval(),
            work_budget: config.work_budget(),
            report_interval: config.report_interval(),
            state: CandidateState::Idle,
            leading_since: None,
            status,
            events: None,
            id,
        })
    }

    /// Reseed the backoff RNG with exactly `seed`, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Report leadership transitions on `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ElectionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> CandidateState {
        self.state
    }

    pub fn leading_since(&self) -> Option<u64> {
        self.leading_since
    }

    /// Watch this candidate's status. Intermediate states may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<CandidateStatus> {
        self.status.subscribe()
    }

    /// Run election cycles until `shutdown` is cancelled.
    ///
    /// Store failures never end the loop: a failed acquisition backs off and
    /// retries, a failed renewal ends the current period. Only cancellation
    /// does, and it aborts whatever call or timer the candidate is blocked on.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(candidate = %self.id, key = %self.lease.key(), "candidate started");

        // Cancellation is the only error a cycle returns
        while self.cycle(&shutdown).await.is_ok() {}

        self.leading_since = None;
        self.set_state(CandidateState::Idle);
        self.emit(EventKind::Stopped);
        info!(candidate = %self.id, "candidate stopped");
    }

    async fn cycle(&mut self, shutdown: &CancellationToken) -> Result<(), ElectionError> {
        self.set_state(CandidateState::Attempting);
        let outcome = until_cancelled(shutdown, self.lease.try_acquire(&self.id)).await?;

        match outcome {
            AcquireOutcome::Acquired => self.lead(shutdown).await,
            AcquireOutcome::Contended => {
                debug!(candidate = %self.id, "lease held elsewhere");
                self.back_off(shutdown).await
            }
            AcquireOutcome::StoreError(e) => {
                warn!(candidate = %self.id, error = %e, "acquisition attempt failed");
                self.back_off(shutdown).await
            }
        }
    }

    async fn back_off(&mut self, shutdown: &CancellationToken) -> Result<(), ElectionError> {
        self.set_state(CandidateState::Idle);
        let delay = self.backoff.next_delay(&mut self.rng);
        debug!(candidate = %self.id, delay_ms = delay.as_millis() as u64, "backing off");
        until_cancelled(shutdown, tokio::time::sleep(delay)).await
    }

    async fn lead(&mut self, shutdown: &CancellationToken) -> Result<(), ElectionError> {
        self.leading_since = Some(now_ms());
        self.set_state(CandidateState::Leading);
        self.emit(EventKind::Elected);
        info!(candidate = %self.id, key = %self.lease.key(), "became the leader");

        let period = shutdown.child_token();
        let (worked, renewed) = tokio::join!(
            activity::work(&self.id, &period, self.work_budget, self.report_interval),
            activity::renewal(&self.lease, &self.id, &period, self.tick_interval),
        );

        self.leading_since = None;
        self.set_state(CandidateState::Idle);

        let Some(end) = worked.or(renewed) else {
            // Neither activity ended the period, so shutdown did.
            return Err(ElectionError::Cancelled);
        };

        match &end {
            PeriodEnd::Relinquished => {
                info!(candidate = %self.id, "work budget spent, relinquishing leadership");
            }
            PeriodEnd::LeaseLost(reason) => {
                warn!(candidate = %self.id, ?reason, "lost the lease");
            }
        }
        self.emit(end.into());
        Ok(())
    }

    fn set_state(&mut self, state: CandidateState) {
        self.state = state;
        self.status.send_replace(CandidateStatus {
            id: self.id.clone(),
            state,
            leading_since: self.leading_since,
        });
    }

    fn emit(&self, kind: EventKind) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening any more
            let _ = events.send(ElectionEvent {
                candidate_id: self.id.clone(),
                kind,
                at: Instant::now(),
            });
        }
    }
}

/// Mix the candidate id into a shared seed (FNV-1a) so candidates built from
/// the same config do not retry in lockstep.
fn candidate_seed(seed: u64, id: &str) -> u64 {
    id.bytes().fold(seed ^ 0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Race `fut` against `token`, preferring cancellation when both are ready.
async fn until_cancelled<F: Future>(
    token: &CancellationToken,
    fut: F,
) -> Result<F::Output, ElectionError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ElectionError::Cancelled),
        out = fut => Ok(out),
    }
}
