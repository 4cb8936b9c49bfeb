//! Bounded-concurrency probe sweep.
//!
//! The sweep is run for its side effect on the OS neighbor cache. It returns
//! only after every dispatched probe has settled, so the neighbor table must
//! be read after `sweep` returns and never concurrently with it.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::probe::{ProbeOutcome, Prober};

/// Tally of one sweep, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub dispatched: usize,
    pub reachable: usize,
    pub failed: usize,
}

/// Probe every target with at most `limit` probes in flight.
pub async fn sweep(prober: Arc<dyn Prober>, targets: &[Ipv4Addr], limit: usize) -> SweepSummary {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = SweepSummary::default();

    for &ip in targets {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "Probe semaphore closed");
                break;
            }
        };
        let prober = Arc::clone(&prober);

        tasks.spawn(async move {
            let outcome = prober.probe(ip).await;
            drop(permit);
            outcome
        });
        summary.dispatched += 1;
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(ProbeOutcome::Reachable) => summary.reachable += 1,
            Ok(ProbeOutcome::Unreachable) => {}
            Ok(ProbeOutcome::Failed { .. }) => summary.failed += 1,
            Err(e) => {
                tracing::warn!(error = %e, "Probe task panicked");
                summary.failed += 1;
            }
        }
    }

    tracing::debug!(
        dispatched = summary.dispatched,
        reachable = summary.reachable,
        failed = summary.failed,
        "Probe sweep drained"
    );

    summary
}
