//! Runs a set of candidates for one key under a shared shutdown token.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::candidate::Candidate;
use crate::config::ElectionConfig;
use crate::error::ElectionError;
use crate::infrastructure::CoordinationStore;
use crate::types::{CandidateStatus, ElectionEvent};

struct Running {
    stop: CancellationToken,
    status: watch::Receiver<CandidateStatus>,
    task: JoinHandle<()>,
}

/// The main entry point for running an election. Spawns one task per
/// candidate, each with its own store handle, and tears them all down
/// together.
pub struct Election {
    config: ElectionConfig,
    shutdown: CancellationToken,
    events: Option<mpsc::UnboundedSender<ElectionEvent>>,
    candidates: Vec<(String, Running)>,
}

impl Election {
    pub fn new(config: ElectionConfig) -> Result<Self, ElectionError> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown: CancellationToken::new(),
            events: None,
            candidates: Vec::new(),
        })
    }

    /// Tie the election to an outer token, e.g. a process-wide shutdown.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Subscribe to leadership events of every candidate spawned afterwards.
    pub fn events(&mut self) -> mpsc::UnboundedReceiver<ElectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a candidate on the current runtime and return its id.
    ///
    /// With a configured seed, the n-th spawned candidate draws its backoff
    /// from `seed + n`.
    pub fn spawn_candidate(
        &mut self,
        id: Option<String>,
        store: Box<dyn CoordinationStore>,
    ) -> Result<String, ElectionError> {
        let mut candidate = Candidate::new(id, store, &self.config)?;
        if let Some(seed) = self.config.seed {
            candidate = candidate.with_seed(seed.wrapping_add(self.candidates.len() as u64));
        }
        if let Some(events) = &self.events {
            candidate = candidate.with_events(events.clone());
        }

        let id = candidate.id().to_string();
        if self.candidates.iter().any(|(existing, _)| *existing == id) {
            return Err(ElectionError::InvalidConfig(format!(
                "duplicate candidate id '{id}'"
            )));
        }

        let stop = self.shutdown.child_token();
        let status = candidate.subscribe();
        let task = tokio::spawn(candidate.run(stop.clone()));
        self.candidates.push((id.clone(), Running { stop, status, task }));
        Ok(id)
    }

    pub fn candidate_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Latest status of every candidate, keyed by id.
    pub fn statuses(&self) -> HashMap<String, CandidateStatus> {
        self.candidates
            .iter()
            .map(|(id, running)| (id.clone(), running.status.borrow().clone()))
            .collect()
    }

    /// Stop a single candidate as if its process had died. Its lease, if it
    /// held one, is not released and expires after one TTL.
    pub fn stop_candidate(&self, id: &str) -> bool {
        match self.candidates.iter().find(|(existing, _)| existing == id) {
            Some((_, running)) => {
                running.stop.cancel();
                true
            }
            None => false,
        }
    }

    /// Wait until the shutdown token is cancelled, then join every candidate.
    pub async fn run_until_cancelled(self) {
        self.shutdown.cancelled().await;
        self.join().await;
    }

    /// Cancel the shutdown token and join every candidate.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.join().await;
    }

    async fn join(self) {
        for (id, running) in self.candidates {
            if let Err(e) = running.task.await {
                warn!(candidate = %id, error = %e, "candidate task did not finish cleanly");
            }
        }
        info!(key = %self.config.key, "election stopped");
    }
}
