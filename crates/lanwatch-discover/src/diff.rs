//! Change detection between successive snapshots.
//!
//! Devices are matched by hardware address only. A known device that comes
//! back with a new IP or hostname is `unchanged`, reported with its new
//! values.

use std::collections::BTreeSet;

use lanwatch_core::{Device, HardwareAddress, Snapshot};

/// Classification of one snapshot against the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// In the current snapshot only.
    pub joined: Vec<Device>,
    /// In the previous snapshot only, as last seen.
    pub departed: Vec<Device>,
    /// In both, with current values.
    pub unchanged: Vec<Device>,
}

/// What one scan means relative to the scan before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDelta {
    /// No previous snapshot: everything is reported as one summary.
    Initial(Vec<Device>),
    Changes(SnapshotDiff),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub total_scanned: u32,
    pub joined_count: u32,
    pub departed_count: u32,
    pub unchanged_count: u32,
}

impl SnapshotDiff {
    pub fn joined_keys(&self) -> BTreeSet<HardwareAddress> {
        self.joined.iter().map(|d| d.mac).collect()
    }

    pub fn departed_keys(&self) -> BTreeSet<HardwareAddress> {
        self.departed.iter().map(|d| d.mac).collect()
    }

    pub fn unchanged_keys(&self) -> BTreeSet<HardwareAddress> {
        self.unchanged.iter().map(|d| d.mac).collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.joined.is_empty() || !self.departed.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            total_scanned: (self.joined.len() + self.unchanged.len()) as u32,
            joined_count: self.joined.len() as u32,
            departed_count: self.departed.len() as u32,
            unchanged_count: self.unchanged.len() as u32,
        }
    }
}

impl ScanDelta {
    pub fn summary(&self) -> DiffSummary {
        match self {
            Self::Initial(devices) => DiffSummary {
                total_scanned: devices.len() as u32,
                ..Default::default()
            },
            Self::Changes(diff) => diff.summary(),
        }
    }
}

/// Diff `current` against `previous`; `None` means this is the first scan.
pub fn compare(previous: Option<&Snapshot>, current: &Snapshot) -> ScanDelta {
    match previous {
        None => ScanDelta::Initial(current.devices().cloned().collect()),
        Some(previous) => ScanDelta::Changes(diff(previous, current)),
    }
}

/// Partition the union of both snapshots' keys into joined, departed and
/// unchanged.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> SnapshotDiff {
    let mut result = SnapshotDiff::default();

    for device in current.devices() {
        if previous.contains(&device.mac) {
            result.unchanged.push(device.clone());
        } else {
            result.joined.push(device.clone());
        }
    }

    result.departed = previous
        .devices()
        .filter(|d| !current.contains(&d.mac))
        .cloned()
        .collect();

    result
}
