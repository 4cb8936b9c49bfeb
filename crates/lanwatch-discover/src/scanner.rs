//! Scan pipeline: expand → sweep → read neighbor table → resolve → snapshot.
//!
//! Stages run strictly in order; each depends on the side effects of the one
//! before it. Nothing is retried: a failed neighbor table read gives an empty
//! snapshot for this cycle and the next cycle tries again.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lanwatch_core::{Device, HardwareAddress, Snapshot, Subnet};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::DiscoverConfig;
use crate::neighbor::{self, NeighborReader, NeighborSource, SystemNeighborReader};
use crate::probe::{PingProber, Prober};
use crate::range;
use crate::resolve::{HostnameResolver, ReverseDnsResolver};
use crate::sweep::{self, SweepSummary};

/// Result of a single scan execution.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Unique ID for this scan run.
    pub scan_id: Uuid,
    /// The swept range.
    pub subnet: Subnet,
    pub snapshot: Snapshot,
    pub sweep: SweepSummary,
    /// Why the neighbor table could not be read, if it could not.
    pub degraded: Option<String>,
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration of the scan.
    pub duration: Duration,
}

/// Runs one discovery pass over a subnet.
pub struct ScanEngine {
    prober: Arc<dyn Prober>,
    neighbors: Arc<dyn NeighborReader>,
    resolver: Arc<dyn HostnameResolver>,
    probe_concurrency: usize,
}

impl ScanEngine {
    pub fn new(
        prober: Arc<dyn Prober>,
        neighbors: Arc<dyn NeighborReader>,
        resolver: Arc<dyn HostnameResolver>,
        probe_concurrency: usize,
    ) -> Self {
        Self {
            prober,
            neighbors,
            resolver,
            probe_concurrency,
        }
    }

    /// Engine backed by `ping`, the system neighbor table and reverse DNS.
    pub fn from_config(config: &DiscoverConfig) -> Self {
        Self::new(
            Arc::new(PingProber::new(config.probe_timeout())),
            Arc::new(SystemNeighborReader::new(NeighborSource::from_config(config))),
            Arc::new(ReverseDnsResolver::new(config.hostname_timeout())),
            config.probe_concurrency,
        )
    }

    pub async fn scan(&self, subnet: &Subnet) -> ScanResult {
        let scan_id = Uuid::new_v4();
        let start = Instant::now();

        let targets = range::expand(subnet);
        tracing::info!(
            scan_id = %scan_id,
            subnet = %subnet,
            targets = targets.len(),
            "Probing addresses"
        );

        // Barrier: every probe settles before the neighbor table is read.
        let sweep = sweep::sweep(Arc::clone(&self.prober), &targets, self.probe_concurrency).await;

        tracing::info!(scan_id = %scan_id, reachable = sweep.reachable, "Reading neighbor table");
        let lookup = self.neighbors.read().await;
        let degraded = lookup.degraded_reason().map(str::to_string);

        let entries: Vec<(Ipv4Addr, HardwareAddress)> = lookup
            .into_table()
            .into_iter()
            .filter(|(ip, _)| subnet.contains(*ip) && neighbor::is_host_entry(*ip))
            .collect();

        tracing::info!(
            scan_id = %scan_id,
            devices = entries.len(),
            "Resolving hostnames"
        );
        let devices = self.resolve_all(entries).await;
        let snapshot: Snapshot = devices.into_iter().collect();

        let duration = start.elapsed();
        tracing::info!(
            scan_id = %scan_id,
            subnet = %subnet,
            devices = snapshot.len(),
            degraded = degraded.is_some(),
            duration_ms = duration.as_millis() as u64,
            "Scan complete"
        );

        ScanResult {
            scan_id,
            subnet: *subnet,
            snapshot,
            sweep,
            degraded,
            completed_at: Utc::now(),
            duration,
        }
    }

    /// Resolve every entry concurrently; each lookup carries its own deadline.
    async fn resolve_all(&self, entries: Vec<(Ipv4Addr, HardwareAddress)>) -> Vec<Device> {
        let mut tasks = JoinSet::new();
        for (ip, mac) in entries {
            let resolver = Arc::clone(&self.resolver);
            tasks.spawn(async move { Device::new(ip, mac, resolver.resolve(ip).await) });
        }

        let mut devices = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(device) => devices.push(device),
                Err(e) => tracing::warn!(error = %e, "Hostname task panicked"),
            }
        }
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::{NeighborLookup, NeighborTable};
    use crate::probe::ProbeOutcome;
    use async_trait::async_trait;
    use lanwatch_core::Hostname;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct SilentProber {
        probes: AtomicUsize,
        in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Prober for SilentProber {
        async fn probe(&self, _ip: Ipv4Addr) -> ProbeOutcome {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeOutcome::Unreachable
        }
    }

    /// Fails the test if read while probes are still in flight.
    struct FixedNeighbors {
        prober: Arc<SilentProber>,
        lookup: NeighborLookup,
        read_during_sweep: AtomicBool,
    }

    #[async_trait]
    impl NeighborReader for FixedNeighbors {
        async fn read(&self) -> NeighborLookup {
            if self.prober.in_flight.load(Ordering::SeqCst) != 0
                || self.prober.probes.load(Ordering::SeqCst) != 254
            {
                self.read_during_sweep.store(true, Ordering::SeqCst);
            }
            self.lookup.clone()
        }
    }

    struct NamedResolver;

    #[async_trait]
    impl HostnameResolver for NamedResolver {
        async fn resolve(&self, ip: Ipv4Addr) -> Hostname {
            match ip.octets()[3] {
                10 => Hostname::Resolved("printer".to_string()),
                _ => Hostname::Unknown,
            }
        }
    }

    fn engine(lookup: NeighborLookup) -> (ScanEngine, Arc<FixedNeighbors>) {
        let prober = Arc::new(SilentProber {
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        });
        let neighbors = Arc::new(FixedNeighbors {
            prober: prober.clone(),
            lookup,
            read_during_sweep: AtomicBool::new(false),
        });
        let engine = ScanEngine::new(prober, neighbors.clone(), Arc::new(NamedResolver), 50);
        (engine, neighbors)
    }

    fn table(entries: &[(&str, &str)]) -> NeighborTable {
        entries
            .iter()
            .map(|(ip, mac)| (ip.parse().unwrap(), mac.parse().unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_scan_restricts_to_subnet_and_resolves() {
        let (engine, neighbors) = engine(NeighborLookup::Table(table(&[
            ("192.168.1.10", "aa:bb:cc:dd:ee:01"),
            ("192.168.1.20", "aa:bb:cc:dd:ee:02"),
            ("192.168.10.5", "aa:bb:cc:dd:ee:03"),
            ("10.0.0.1", "aa:bb:cc:dd:ee:04"),
        ])));
        let subnet = Subnet::parse("192.168.1.0/24").unwrap();

        let result = engine.scan(&subnet).await;

        assert!(!neighbors.read_during_sweep.load(Ordering::SeqCst));
        assert_eq!(result.sweep.dispatched, 254);
        assert!(result.degraded.is_none());
        assert_eq!(result.snapshot.len(), 2);

        let printer = result.snapshot.get(&"aa:bb:cc:dd:ee:01".parse().unwrap()).unwrap();
        assert_eq!(printer.ip, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(printer.hostname, Hostname::Resolved("printer".to_string()));

        let other = result.snapshot.get(&"aa:bb:cc:dd:ee:02".parse().unwrap()).unwrap();
        assert_eq!(other.hostname.as_str(), "Unknown");
    }

    #[tokio::test]
    async fn test_broadcast_from_any_reader_is_dropped() {
        let (engine, _) = engine(NeighborLookup::Table(table(&[
            ("192.168.1.10", "aa:bb:cc:dd:ee:01"),
            ("192.168.1.255", "ff:ff:ff:ff:ff:fe"),
        ])));
        let subnet = Subnet::parse("192.168.1.0/24").unwrap();

        let result = engine.scan(&subnet).await;

        assert_eq!(result.snapshot.len(), 1);
        assert!(result.snapshot.by_ip().iter().all(|d| d.ip.octets()[3] != 255));
    }

    #[tokio::test]
    async fn test_unavailable_table_gives_empty_snapshot() {
        let (engine, _) = engine(NeighborLookup::Unavailable {
            reason: "arp: not found".to_string(),
        });
        let subnet = Subnet::parse("192.168.1.0/24").unwrap();

        let result = engine.scan(&subnet).await;

        assert!(result.snapshot.is_empty());
        assert_eq!(result.degraded.as_deref(), Some("arp: not found"));
    }
}
