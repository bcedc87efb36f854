#[cfg(test)]
mod tests {
    use crate::config::ElectionConfig;
    use crate::scheduler::BackoffPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_delays_stay_within_bounds() {
        let policy = BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(100));
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..10_000 {
            let delay = policy.next_delay(&mut rng);
            assert!(delay >= Duration::from_millis(50), "{delay:?} below min");
            assert!(delay <= Duration::from_millis(150), "{delay:?} above max");
        }
    }

    #[test]
    fn test_delays_are_jittered() {
        let policy = BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(100));
        let mut rng = StdRng::seed_from_u64(7);

        let distinct: HashSet<Duration> = (0..200).map(|_| policy.next_delay(&mut rng)).collect();
        // Lockstep retries are exactly what the jitter is there to prevent
        assert!(distinct.len() > 20);
    }

    #[test]
    fn test_zero_spread_is_fixed_delay() {
        let policy = BackoffPolicy::new(Duration::from_millis(75), Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(policy.next_delay(&mut rng), Duration::from_millis(75));
        assert_eq!(policy.max_delay(), Duration::from_millis(75));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let policy = ElectionConfig::default().backoff();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);

        let left: Vec<Duration> = (0..16).map(|_| policy.next_delay(&mut a)).collect();
        let right: Vec<Duration> = (0..16).map(|_| policy.next_delay(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_default_policy_matches_config() {
        let policy = ElectionConfig::default().backoff();
        assert_eq!(policy.min_delay(), Duration::from_millis(50));
        assert_eq!(policy.max_delay(), Duration::from_millis(150));
    }
}
