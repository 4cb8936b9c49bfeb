//! The discovery loop.
//!
//! Runs one scan at a time: scan, diff against the previous snapshot, report
//! to every sink, remember the snapshot, sleep, repeat. A scan that runs past
//! the interval just delays the next one; scans never overlap.

use std::sync::Arc;
use std::time::Duration;

use lanwatch_core::{DiscoveryEvent, EventPayload, Snapshot, Subnet};

use crate::diff::{self, DiffSummary, ScanDelta};
use crate::scanner::{ScanEngine, ScanResult};
use crate::sink::EventSink;

/// Where the loop is in its lifetime. `InitialScan` is left after the first
/// snapshot and never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    InitialScan,
    SteadyState,
}

/// Outcome of one cycle, mostly for tests and `--once`.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub scan: ScanResult,
    pub events: Vec<DiscoveryEvent>,
    pub summary: DiffSummary,
}

pub struct DiscoveryLoop {
    engine: ScanEngine,
    subnet: Subnet,
    interval: Duration,
    sinks: Vec<Arc<dyn EventSink>>,
    state: LoopState,
    previous: Option<Snapshot>,
}

impl DiscoveryLoop {
    pub fn new(engine: ScanEngine, subnet: Subnet, interval: Duration) -> Self {
        Self {
            engine,
            subnet,
            interval,
            sinks: Vec::new(),
            state: LoopState::InitialScan,
            previous: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Run forever. Cancel by dropping the future (e.g. from `select!` on
    /// Ctrl-C); there is no state to flush.
    pub async fn run(&mut self) {
        tracing::info!(
            subnet = %self.subnet,
            interval_secs = self.interval.as_secs(),
            sinks = self.sinks.len(),
            "Discovery loop started"
        );

        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One iteration: scan, classify, emit, store.
    pub async fn run_cycle(&mut self) -> CycleReport {
        for sink in &self.sinks {
            sink.on_scan_start().await;
        }
        let scan = self.engine.scan(&self.subnet).await;

        let delta = match (self.state, self.previous.as_ref()) {
            (LoopState::SteadyState, Some(previous)) => {
                ScanDelta::Changes(diff::diff(previous, &scan.snapshot))
            }
            _ => diff::compare(None, &scan.snapshot),
        };
        let summary = delta.summary();
        let events = build_events(&scan, delta);

        if let Some(reason) = &scan.degraded {
            tracing::warn!(scan_id = %scan.scan_id, reason = %reason, "Cycle ran without a neighbor table");
        }
        tracing::info!(
            scan_id = %scan.scan_id,
            state = ?self.state,
            devices = summary.total_scanned,
            joined = summary.joined_count,
            departed = summary.departed_count,
            "Cycle complete"
        );

        for event in &events {
            for sink in &self.sinks {
                sink.on_event(event).await;
            }
        }
        for sink in &self.sinks {
            sink.on_cycle(&scan).await;
        }

        self.previous = Some(scan.snapshot.clone());
        self.state = LoopState::SteadyState;

        CycleReport {
            scan,
            events,
            summary,
        }
    }
}

/// Events for one cycle: the initial summary or one event per join and
/// departure, then `ScanCompleted`.
fn build_events(scan: &ScanResult, delta: ScanDelta) -> Vec<DiscoveryEvent> {
    let summary = delta.summary();
    let mut events = Vec::new();

    match delta {
        ScanDelta::Initial(devices) => {
            events.push(DiscoveryEvent::new(
                scan.scan_id,
                EventPayload::InitialScan { devices },
            ));
        }
        ScanDelta::Changes(changes) => {
            events.extend(changes.joined.into_iter().map(|device| {
                DiscoveryEvent::new(scan.scan_id, EventPayload::DeviceJoined { device })
            }));
            events.extend(changes.departed.into_iter().map(|device| {
                DiscoveryEvent::new(scan.scan_id, EventPayload::DeviceDeparted { device })
            }));
        }
    }

    events.push(DiscoveryEvent::new(
        scan.scan_id,
        EventPayload::ScanCompleted {
            device_count: scan.snapshot.len() as u32,
            joined: summary.joined_count,
            departed: summary.departed_count,
            degraded: scan.degraded.clone(),
            duration_ms: scan.duration.as_millis() as u64,
        },
    ));

    events
}
