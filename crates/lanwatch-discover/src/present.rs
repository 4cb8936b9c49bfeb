//! Console output: join/leave lines and the per-cycle device table.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use lanwatch_core::{DiscoveryEvent, EventPayload, Snapshot};

use crate::directory::DeviceDirectory;
use crate::scanner::ScanResult;
use crate::sink::EventSink;

const RULE_WIDTH: usize = 65;

/// Prints to stdout. Logs go to stderr, so the two never interleave on one
/// stream.
pub struct ConsolePresenter {
    directory: Arc<DeviceDirectory>,
    interval: Duration,
}

impl ConsolePresenter {
    pub fn new(directory: Arc<DeviceDirectory>, interval: Duration) -> Self {
        Self {
            directory,
            interval,
        }
    }
}

#[async_trait]
impl EventSink for ConsolePresenter {
    async fn on_scan_start(&self) {
        println!("\nScanning network...");
    }

    async fn on_event(&self, event: &DiscoveryEvent) {
        if let Some(line) = event_line(&event.payload) {
            println!("\n{line}");
        }
    }

    async fn on_cycle(&self, scan: &ScanResult) {
        println!(
            "\n{}",
            render_table(&scan.snapshot, &self.directory, scan.completed_at)
        );
        println!("\nNext scan in {} seconds...", self.interval.as_secs());
    }
}

/// Console line for a join or departure; other events print nothing.
pub fn event_line(payload: &EventPayload) -> Option<String> {
    match payload {
        EventPayload::DeviceJoined { device } => Some(format!(
            "[NEW DEVICE] {} ({}) joined the network!",
            device.hostname, device.ip
        )),
        EventPayload::DeviceDeparted { device } => Some(format!(
            "[DISCONNECTED] {} ({}) left the network.",
            device.hostname, device.ip
        )),
        EventPayload::InitialScan { .. } | EventPayload::ScanCompleted { .. } => None,
    }
}

/// Fixed-width table of every device in the snapshot, sorted by IP.
pub fn render_table(snapshot: &Snapshot, directory: &DeviceDirectory, at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let stamp = at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");

    let _ = writeln!(out, "--- Scan result at {stamp} ---");
    let _ = writeln!(out, "{:<15} {:<20} {:<30}", "IP Address", "MAC Address", "Hostname/Alias");
    let _ = write!(out, "{}", "-".repeat(RULE_WIDTH));

    if snapshot.is_empty() {
        let _ = write!(out, "\nNo devices found.");
        return out;
    }

    for device in snapshot.by_ip() {
        let _ = write!(
            out,
            "\n{:<15} {:<20} {:<30}",
            device.ip.to_string(),
            device.mac.to_string(),
            directory.device_name(device)
        );
    }
    out
}
