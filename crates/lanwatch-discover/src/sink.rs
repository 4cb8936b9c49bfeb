//! Receivers of discovery loop output.

use async_trait::async_trait;
use lanwatch_core::DiscoveryEvent;

use crate::scanner::ScanResult;

/// Something the discovery loop reports to. Implementations absorb their
/// own failures; nothing a sink does can stop the loop.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Called before each cycle's scan begins.
    async fn on_scan_start(&self) {}

    /// Called once per event, in emission order.
    async fn on_event(&self, event: &DiscoveryEvent);

    /// Called after all of a cycle's events have been delivered.
    async fn on_cycle(&self, _scan: &ScanResult) {}
}
