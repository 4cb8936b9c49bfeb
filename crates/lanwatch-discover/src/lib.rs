//! lanwatch-discover: LAN host discovery for the lanwatch monitor.
//!
//! Sweeps a /24 with ping to populate the OS neighbor cache, reads the
//! neighbor table, resolves hostnames, and reports devices joining or
//! leaving between successive scans.

pub mod config;
pub mod diff;
pub mod directory;
pub mod error;
pub mod neighbor;
pub mod notify;
pub mod present;
pub mod probe;
pub mod range;
pub mod resolve;
pub mod scanner;
pub mod scheduler;
pub mod sink;
pub mod sweep;
