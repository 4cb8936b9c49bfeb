//! lanwatch-core: Shared types and error handling for the lanwatch network monitor.
//!
//! This crate provides the foundational types used by the discovery engine:
//! - `Subnet` parsing for the swept /24 range
//! - `HardwareAddress`, `Device` and `Snapshot`, the per-scan device model
//! - Event types emitted to notification and presentation sinks
//! - Common error types

pub mod error;
pub mod events;
pub mod types;

pub use error::CoreError;
pub use events::{DiscoveryEvent, EventPayload};
pub use types::{Device, HardwareAddress, Hostname, Snapshot, Subnet};
