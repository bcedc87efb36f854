use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use baton_core::types::{ElectionEvent, EventKind};
use baton_core::{Election, ElectionConfig, Lease};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::storage::{StorageSpec, StoreFactory};

// ─── Config Loading ─────────────────────────────────────────────────────────

/// Defaults, overlaid with the JSON file at `path` if one is given.
pub fn load_config(path: Option<&Path>) -> Result<ElectionConfig> {
    let Some(path) = path else {
        return Ok(ElectionConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid election config in '{}'", path.display()))
}

// ─── Summary ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
pub struct CandidateSummary {
    pub periods: u32,
    pub relinquished: u32,
    pub lease_lost: u32,
    pub total_leading_ms: u64,
    pub longest_period_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ElectionSummary {
    pub key: String,
    pub candidates: BTreeMap<String, CandidateSummary>,
    /// Leadership periods that started after another one ended
    pub handoffs: u32,
    /// Longest stretch with no candidate believing it leads
    pub longest_gap_ms: u64,
}

/// Folds a stream of leadership events into an [`ElectionSummary`].
pub struct Summarizer {
    summary: ElectionSummary,
    open: HashMap<String, Instant>,
    last_end: Option<Instant>,
}

impl Summarizer {
    pub fn new(key: &str) -> Self {
        Self {
            summary: ElectionSummary {
                key: key.to_string(),
                candidates: BTreeMap::new(),
                handoffs: 0,
                longest_gap_ms: 0,
            },
            open: HashMap::new(),
            last_end: None,
        }
    }

    pub fn record(&mut self, event: &ElectionEvent) {
        let entry = self
            .summary
            .candidates
            .entry(event.candidate_id.clone())
            .or_default();

        match &event.kind {
            EventKind::Elected => {
                entry.periods += 1;
                if let Some(last_end) = self.last_end.take() {
                    self.summary.handoffs += 1;
                    let gap = event.at.saturating_duration_since(last_end).as_millis() as u64;
                    self.summary.longest_gap_ms = self.summary.longest_gap_ms.max(gap);
                }
                self.open.insert(event.candidate_id.clone(), event.at);
                return;
            }
            EventKind::Relinquished => entry.relinquished += 1,
            EventKind::LeaseLost { .. } => entry.lease_lost += 1,
            EventKind::Stopped => {}
        }

        if let Some(start) = self.open.remove(&event.candidate_id) {
            let held = event.at.saturating_duration_since(start).as_millis() as u64;
            entry.total_leading_ms += held;
            entry.longest_period_ms = entry.longest_period_ms.max(held);
            self.last_end = Some(event.at);
        }
    }

    pub fn finish(self) -> ElectionSummary {
        self.summary
    }
}

async fn summarize(key: String, mut events: mpsc::UnboundedReceiver<ElectionEvent>) -> ElectionSummary {
    let mut summarizer = Summarizer::new(&key);
    while let Some(event) = events.recv().await {
        summarizer.record(&event);
    }
    summarizer.finish()
}

// ─── Commands ───────────────────────────────────────────────────────────────

/// Run `candidates` competing candidates for `duration_secs` or until Ctrl-C.
pub async fn run(
    config: ElectionConfig,
    storage: &str,
    candidates: usize,
    duration_secs: u64,
) -> Result<ElectionSummary> {
    if candidates == 0 {
        bail!("at least one candidate is required");
    }

    let factory = StoreFactory::new(StorageSpec::parse(storage)?);
    let key = config.key.clone();
    let mut election = Election::new(config)?;
    let events = election.events();

    // Prefixed with the pid so candidates of several processes stay distinct
    let pid = std::process::id();
    for i in 0..candidates {
        let store = factory.connect().await?;
        election.spawn_candidate(Some(format!("{pid}-worker-{i}")), store)?;
    }
    tracing::info!(%key, candidates, duration_secs, "🗳️  election started");

    let shutdown = election.shutdown_token();
    let stopper = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(duration_secs)) => {
                tracing::info!("⏱️  run duration elapsed");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("🛑 interrupted");
            }
        }
        shutdown.cancel();
    });

    let collector = tokio::spawn(summarize(key, events));
    election.run_until_cancelled().await;
    stopper.await.context("shutdown timer panicked")?;
    collector.await.context("event collector panicked")
}

/// Look up the current holder of `key`.
pub async fn read_holder(storage: &str, key: &str) -> Result<Option<String>> {
    let spec = StorageSpec::parse(storage)?;
    if spec == StorageSpec::Memory {
        tracing::warn!("in-memory storage is per-process; there is never a holder to read");
    }
    let store = StoreFactory::new(spec).connect().await?;
    let lease = Lease::new(store, key, ElectionConfig::default().ttl());
    Ok(lease.read_holder().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::types::LossReason;

    fn event(candidate: &str, kind: EventKind, at: Instant) -> ElectionEvent {
        ElectionEvent {
            candidate_id: candidate.to_string(),
            kind,
            at,
        }
    }

    #[test]
    fn test_summarizer_tracks_periods_and_gaps() {
        let t0 = Instant::now();
        let ms = Duration::from_millis;
        let mut summarizer = Summarizer::new("leader");

        summarizer.record(&event("a", EventKind::Elected, t0));
        summarizer.record(&event("a", EventKind::Relinquished, t0 + ms(3_000)));
        summarizer.record(&event("b", EventKind::Elected, t0 + ms(3_600)));
        summarizer.record(&event(
            "b",
            EventKind::LeaseLost {
                reason: LossReason::NotHolder,
            },
            t0 + ms(4_600),
        ));
        summarizer.record(&event("c", EventKind::Elected, t0 + ms(4_700)));
        summarizer.record(&event("c", EventKind::Stopped, t0 + ms(5_000)));
        summarizer.record(&event("a", EventKind::Stopped, t0 + ms(5_000)));

        let summary = summarizer.finish();
        assert_eq!(summary.key, "leader");
        assert_eq!(summary.handoffs, 2);
        assert_eq!(summary.longest_gap_ms, 600);

        let a = &summary.candidates["a"];
        assert_eq!((a.periods, a.relinquished, a.lease_lost), (1, 1, 0));
        assert_eq!(a.longest_period_ms, 3_000);

        let b = &summary.candidates["b"];
        assert_eq!((b.periods, b.lease_lost), (1, 1));
        assert_eq!(b.total_leading_ms, 1_000);

        assert_eq!(summary.candidates["c"].total_leading_ms, 300);
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), ElectionConfig::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_in_memory_produces_summary() {
        let config = ElectionConfig {
            seed: Some(1),
            ..ElectionConfig::default()
        };
        let summary = run(config, "memory", 3, 10).await.unwrap();

        assert_eq!(summary.candidates.len(), 3);
        let periods: u32 = summary.candidates.values().map(|c| c.periods).sum();
        assert!(periods >= 2);
        assert!(summary.longest_gap_ms <= 1_150);
    }
}
