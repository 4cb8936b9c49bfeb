//! Error types for the lanwatch-discover crate.
//!
//! Only `InvalidSubnet` and `Config` are fatal. The rest describe leaf
//! failures that are absorbed into tagged outcomes where they occur.

use std::net::Ipv4Addr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error(transparent)]
    InvalidSubnet(#[from] lanwatch_core::CoreError),

    #[error("Probe of {ip} failed: {reason}")]
    ProbeFailed { ip: Ipv4Addr, reason: String },

    #[error("Neighbor table unavailable: {0}")]
    NeighborTableUnavailable(String),

    #[error("Reverse lookup of {ip} timed out")]
    HostnameTimeout { ip: Ipv4Addr },

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
