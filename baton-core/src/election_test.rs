#[cfg(test)]
mod tests {
    use crate::config::ElectionConfig;
    use crate::election::Election;
    use crate::error::ElectionError;
    use crate::infrastructure_in_memory::InMemoryStore;
    use crate::types::{CandidateState, ElectionEvent, EventKind};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout, Instant};

    /// One leadership period as seen through a candidate's events.
    #[derive(Debug)]
    struct Span {
        candidate: String,
        start: Instant,
        end: Instant,
    }

    fn config(seed: u64) -> ElectionConfig {
        ElectionConfig {
            seed: Some(seed),
            ..ElectionConfig::default()
        }
    }

    fn spawn_election(
        config: ElectionConfig,
        candidates: usize,
    ) -> (Election, Arc<InMemoryStore>, mpsc::UnboundedReceiver<ElectionEvent>) {
        let store = Arc::new(InMemoryStore::new());
        let mut election = Election::new(config).unwrap();
        let events = election.events();
        for i in 0..candidates {
            election
                .spawn_candidate(Some(format!("worker-{i}")), Box::new(Arc::clone(&store)))
                .unwrap();
        }
        (election, store, events)
    }

    async fn drain(mut events: mpsc::UnboundedReceiver<ElectionEvent>) -> Vec<ElectionEvent> {
        let mut all = Vec::new();
        while let Some(event) = events.recv().await {
            all.push(event);
        }
        all
    }

    fn spans(events: &[ElectionEvent]) -> Vec<Span> {
        let mut open: HashMap<String, Instant> = HashMap::new();
        let mut spans = Vec::new();
        for event in events {
            match event.kind {
                EventKind::Elected => {
                    open.insert(event.candidate_id.clone(), event.at);
                }
                _ => {
                    if let Some(start) = open.remove(&event.candidate_id) {
                        spans.push(Span {
                            candidate: event.candidate_id.clone(),
                            start,
                            end: event.at,
                        });
                    }
                }
            }
        }
        spans.sort_by_key(|span| span.start);
        spans
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_candidates_for_twenty_seconds() {
        let config = config(2024);
        let ttl = config.ttl();
        let longest_period = config.work_budget() + config.tick_interval();
        let longest_gap = ttl + config.backoff().max_delay();
        let (election, _store, events) = spawn_election(config, 5);

        // Sample leadership beliefs throughout the run
        for _ in 0..200 {
            sleep(Duration::from_millis(100)).await;
            let leading = election
                .statuses()
                .values()
                .filter(|status| status.state == CandidateState::Leading)
                .count();
            assert!(leading <= 1, "{leading} candidates leading at once");
        }
        election.shutdown().await;

        let spans = spans(&drain(events).await);
        assert!(spans.len() >= 4, "only {} leadership periods", spans.len());

        for span in &spans {
            let held = span.end - span.start;
            assert!(held <= longest_period, "{} led for {held:?}", span.candidate);
        }
        for pair in spans.windows(2) {
            assert!(pair[1].start >= pair[0].end, "overlapping leadership: {pair:?}");
            let gap = pair[1].start - pair[0].end;
            assert!(gap <= longest_gap, "leaderless for {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_leadership_rotates() {
        let (election, _store, events) = spawn_election(config(5), 5);
        sleep(Duration::from_secs(60)).await;
        election.shutdown().await;

        let leaders: HashSet<String> = spans(&drain(events).await)
            .into_iter()
            .map(|span| span.candidate)
            .collect();
        assert!(leaders.len() >= 2, "leadership never moved: {leaders:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_leader_is_replaced_within_ttl_and_backoff() {
        let config = config(77);
        let tick = config.tick_interval();
        let bound = config.ttl() + config.backoff().max_delay();
        let (election, store, mut events) = spawn_election(config, 5);

        let first = events.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Elected);

        // Renewals land at +500ms and +1000ms; kill the leader after the
        // second one, mid-period.
        sleep(Duration::from_millis(1_200)).await;
        assert!(election.stop_candidate(&first.candidate_id));
        let last_renewal = first.at + tick * 2;
        assert!(last_renewal <= Instant::now());
        assert_eq!(
            store.live_value("leader").as_deref(),
            Some(first.candidate_id.as_str())
        );

        let successor = loop {
            let event = events.recv().await.unwrap();
            if event.kind == EventKind::Elected {
                break event;
            }
        };
        assert_ne!(successor.candidate_id, first.candidate_id);
        assert!(successor.at - last_renewal <= bound);

        election.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_candidates_within_one_tick() {
        let config = config(3);
        let tick = config.tick_interval();
        let (election, store, events) = spawn_election(config, 5);
        sleep(Duration::from_millis(5_200)).await;

        timeout(tick, election.shutdown())
            .await
            .expect("candidates outlived one tick");

        let calls = store.operation_count();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(store.operation_count(), calls);

        let stopped = drain(events)
            .await
            .into_iter()
            .filter(|event| event.kind == EventKind::Stopped)
            .count();
        assert_eq!(stopped, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outer_token_drives_shutdown() {
        let token = tokio_util::sync::CancellationToken::new();
        let store = Arc::new(InMemoryStore::new());
        let mut election = Election::new(config(9))
            .unwrap()
            .with_shutdown(token.clone());
        election
            .spawn_candidate(None, Box::new(Arc::clone(&store)))
            .unwrap();

        let runner = tokio::spawn(election.run_until_cancelled());
        sleep(Duration::from_secs(1)).await;
        token.cancel();
        timeout(Duration::from_millis(500), runner)
            .await
            .expect("election did not stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_candidate_id_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let mut election = Election::new(config(1)).unwrap();
        election
            .spawn_candidate(Some("worker-0".into()), Box::new(Arc::clone(&store)))
            .unwrap();

        let duplicate =
            election.spawn_candidate(Some("worker-0".into()), Box::new(Arc::clone(&store)));
        assert!(matches!(duplicate, Err(ElectionError::InvalidConfig(_))));
        assert_eq!(election.candidate_ids(), vec!["worker-0".to_string()]);
        assert!(!election.stop_candidate("worker-9"));

        election.shutdown().await;
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let config = ElectionConfig {
            work_budget_ms: 0,
            ..ElectionConfig::default()
        };
        assert!(matches!(
            Election::new(config),
            Err(ElectionError::InvalidConfig(_))
        ));
    }
}
