//! Single-address reachability probe.
//!
//! The probe exists to make the OS resolve the target's link-layer address:
//! sending an ICMP echo to an on-link address triggers an ARP exchange that
//! populates the neighbor cache, whether or not the echo is answered in time.

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DiscoverError;

/// Extra time granted to process startup on top of the probe deadline.
const SPAWN_GRACE: Duration = Duration::from_millis(250);

/// Result of probing one address. Only `Reachable` means anything; a failed
/// probe is indistinguishable from a silent host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    Failed { reason: String },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, ip: Ipv4Addr) -> ProbeOutcome;
}

/// Probes with the platform `ping` binary, one echo request per address.
pub struct PingProber {
    program: String,
    timeout: Duration,
}

impl PingProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ping".to_string(),
            timeout,
        }
    }

    /// Arguments for a single echo with `timeout`, per platform.
    pub fn ping_args(ip: Ipv4Addr, timeout: Duration) -> Vec<String> {
        let millis = timeout.as_millis().max(1);
        let mut args = if cfg!(windows) {
            vec![
                "-n".to_string(),
                "1".to_string(),
                "-w".to_string(),
                millis.to_string(),
            ]
        } else if cfg!(target_os = "macos") {
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                millis.to_string(),
            ]
        } else {
            // iputils takes whole seconds; the outer deadline cuts it short.
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                "1".to_string(),
            ]
        };
        args.push(ip.to_string());
        args
    }

    async fn run(&self, ip: Ipv4Addr) -> Result<bool, DiscoverError> {
        let mut command = Command::new(&self.program);
        command
            .args(Self::ping_args(ip, self.timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout + SPAWN_GRACE, command.status()).await {
            Ok(Ok(status)) => Ok(status.success()),
            Ok(Err(e)) => Err(DiscoverError::ProbeFailed {
                ip,
                reason: e.to_string(),
            }),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, ip: Ipv4Addr) -> ProbeOutcome {
        match self.run(ip).await {
            Ok(true) => ProbeOutcome::Reachable,
            Ok(false) => ProbeOutcome::Unreachable,
            Err(e) => {
                tracing::debug!(ip = %ip, error = %e, "Probe failed");
                ProbeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_args_single_echo() {
        let args = PingProber::ping_args(Ipv4Addr::new(192, 168, 1, 7), Duration::from_millis(100));
        assert_eq!(args.last().map(String::as_str), Some("192.168.1.7"));
        assert_eq!(args.len(), 5);
        if cfg!(windows) {
            assert_eq!(&args[..4], ["-n", "1", "-w", "100"]);
        } else {
            assert_eq!(&args[..2], ["-c", "1"]);
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_failed_not_panic() {
        let prober = PingProber {
            program: "lanwatch-no-such-ping-binary".to_string(),
            timeout: Duration::from_millis(100),
        };
        let outcome = prober.probe(Ipv4Addr::new(192, 0, 2, 1)).await;
        assert!(matches!(outcome, ProbeOutcome::Failed { .. }));
        assert!(!outcome.is_reachable());
    }
}
