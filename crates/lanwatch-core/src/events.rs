//! Event types emitted by the discovery loop.
//!
//! Events flow one way, from the loop to its sinks (notifier, console).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Device;

/// Unique identifier for an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// An event produced by one scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    pub id: EventId,
    /// The scan cycle that produced this event.
    pub scan_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl DiscoveryEvent {
    pub fn new(scan_id: Uuid, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            scan_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// The event payload, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    /// Summary of the very first scan. Emitted once, instead of one
    /// `DeviceJoined` per device.
    InitialScan { devices: Vec<Device> },
    /// A hardware address absent from the previous scan.
    DeviceJoined { device: Device },
    /// A hardware address present in the previous scan but not this one.
    /// Carries the device as it was last seen.
    DeviceDeparted { device: Device },
    /// End of a scan cycle.
    ScanCompleted {
        device_count: u32,
        joined: u32,
        departed: u32,
        /// Set when the neighbor table could not be read this cycle.
        degraded: Option<String>,
        duration_ms: u64,
    },
}
