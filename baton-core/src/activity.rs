//! The two activities of a leadership period.
//!
//! Both run concurrently and hold the same period token. Whichever decides
//! first that the period is over cancels the token; the other sees the
//! cancellation at its next suspension point and returns `None`. The winner
//! returns the reason the period ended.

use std::time::Duration;

use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lease::Lease;
use crate::types::{LossReason, PeriodEnd, RenewOutcome};

/// Leader-only duties. Here they amount to reporting progress until the work
/// budget is spent, at which point leadership is handed back.
pub async fn work(
    candidate_id: &str,
    period: &CancellationToken,
    budget: Duration,
    report_interval: Duration,
) -> Option<PeriodEnd> {
    let deadline = sleep(budget);
    tokio::pin!(deadline);
    let mut report = interval_at(Instant::now() + report_interval, report_interval);
    report.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = period.cancelled() => return None,
            _ = &mut deadline => {
                period.cancel();
                return Some(PeriodEnd::Relinquished);
            }
            _ = report.tick() => {
                info!(candidate = %candidate_id, "still the leader");
            }
        }
    }
}

/// Renew the lease every `tick`, ending the period as soon as a renewal is
/// not confirmed. `tick` must be shorter than the lease TTL.
pub async fn renewal(
    lease: &Lease,
    candidate_id: &str,
    period: &CancellationToken,
    tick: Duration,
) -> Option<PeriodEnd> {
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = period.cancelled() => return None,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = period.cancelled() => return None,
            outcome = lease.renew(candidate_id) => outcome,
        };

        let reason = match outcome {
            RenewOutcome::Renewed => {
                debug!(candidate = %candidate_id, key = %lease.key(), "lease renewed");
                continue;
            }
            RenewOutcome::NotHolder => LossReason::NotHolder,
            RenewOutcome::StoreError(e) => {
                warn!(candidate = %candidate_id, error = %e, "lease renewal failed");
                LossReason::StoreError(e.to_string())
            }
        };

        period.cancel();
        return Some(PeriodEnd::LeaseLost(reason));
    }
}
