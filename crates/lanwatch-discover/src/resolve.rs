//! Best-effort reverse name lookup under a hard deadline.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use dns_lookup::lookup_addr;
use lanwatch_core::Hostname;

use crate::error::DiscoverError;

/// Blocking reverse lookup run on the blocking pool.
pub type LookupFn = fn(&IpAddr) -> io::Result<String>;

#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn resolve(&self, ip: Ipv4Addr) -> Hostname;
}

/// Reverse DNS through the system resolver (`getnameinfo`).
///
/// The blocking lookup runs on the blocking pool. On timeout the lookup is
/// abandoned, not awaited, so a dead name server costs at most `timeout`.
pub struct ReverseDnsResolver {
    timeout: Duration,
    lookup: LookupFn,
}

impl ReverseDnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self::with_lookup(timeout, system_lookup)
    }

    pub fn with_lookup(timeout: Duration, lookup: LookupFn) -> Self {
        Self { timeout, lookup }
    }

    async fn lookup(&self, ip: Ipv4Addr) -> Result<Option<String>, DiscoverError> {
        let lookup = self.lookup;
        let task = tokio::task::spawn_blocking(move || lookup(&IpAddr::V4(ip)));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(name))) => Ok(usable_name(ip, name)),
            Ok(Ok(Err(e))) => {
                tracing::trace!(ip = %ip, error = %e, "Reverse lookup failed");
                Ok(None)
            }
            Ok(Err(e)) => {
                tracing::warn!(ip = %ip, error = %e, "Reverse lookup task failed");
                Ok(None)
            }
            Err(_) => Err(DiscoverError::HostnameTimeout { ip }),
        }
    }
}

#[async_trait]
impl HostnameResolver for ReverseDnsResolver {
    async fn resolve(&self, ip: Ipv4Addr) -> Hostname {
        match self.lookup(ip).await {
            Ok(Some(name)) => Hostname::Resolved(name),
            Ok(None) => Hostname::Unknown,
            Err(e) => {
                tracing::debug!(error = %e, "Hostname left unknown");
                Hostname::Unknown
            }
        }
    }
}

fn system_lookup(ip: &IpAddr) -> io::Result<String> {
    Ok(lookup_addr(ip)?)
}

/// `getnameinfo` hands back the numeric address when there is no PTR record.
fn usable_name(ip: Ipv4Addr, name: String) -> Option<String> {
    let name = name.trim().trim_end_matches('.').to_string();
    if name.is_empty() || name == ip.to_string() {
        None
    } else {
        Some(name)
    }
}
