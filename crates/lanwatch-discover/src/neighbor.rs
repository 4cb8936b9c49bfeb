//! Neighbor (ARP) table extraction and parsing.
//!
//! Entries are read from `/proc/net/arp` on Linux or from the platform `arp`
//! command, then filtered down to unicast host addresses. Read failures never
//! propagate: they become [`NeighborLookup::Unavailable`], which callers treat
//! as an empty table.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use lanwatch_core::HardwareAddress;
use regex::Regex;
use tokio::process::Command;

use crate::config::{DiscoverConfig, NeighborSourceKind};
use crate::error::{DiscoverError, Result};

/// Address to hardware address, one entry per IP.
pub type NeighborTable = BTreeMap<Ipv4Addr, HardwareAddress>;

const PROC_NET_ARP: &str = "/proc/net/arp";

/// Outcome of one neighbor table read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborLookup {
    Table(NeighborTable),
    Unavailable { reason: String },
}

impl NeighborLookup {
    /// The table, or an empty one when it could not be read.
    pub fn into_table(self) -> NeighborTable {
        match self {
            Self::Table(table) => table,
            Self::Unavailable { .. } => NeighborTable::new(),
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Table(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

/// Source of the OS-global neighbor cache.
///
/// Must only be read after the probe sweep has fully drained; the sweep is
/// what populates the cache.
#[async_trait]
pub trait NeighborReader: Send + Sync {
    async fn read(&self) -> NeighborLookup;
}

/// Where a [`SystemNeighborReader`] gets its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborSource {
    ArpCommand { program: String },
    ProcNetArp { path: PathBuf },
}

impl NeighborSource {
    pub fn from_config(config: &DiscoverConfig) -> Self {
        let proc = || Self::ProcNetArp {
            path: PathBuf::from(PROC_NET_ARP),
        };
        let arp = || Self::ArpCommand {
            program: config.arp_program.clone(),
        };

        match config.neighbor_source {
            NeighborSourceKind::Proc => proc(),
            NeighborSourceKind::Arp => arp(),
            NeighborSourceKind::Auto if cfg!(target_os = "linux") => proc(),
            NeighborSourceKind::Auto => arp(),
        }
    }
}

/// Reads the neighbor table of the host this process runs on.
pub struct SystemNeighborReader {
    source: NeighborSource,
}

impl SystemNeighborReader {
    pub fn new(source: NeighborSource) -> Self {
        Self { source }
    }

    async fn read_raw(&self) -> Result<NeighborTable> {
        match &self.source {
            NeighborSource::ArpCommand { program } => {
                let flag = if cfg!(windows) { "-a" } else { "-an" };
                let output = Command::new(program).arg(flag).output().await?;

                if !output.status.success() {
                    return Err(DiscoverError::NeighborTableUnavailable(format!(
                        "{program} exited with code {}: {}",
                        output.status.code().unwrap_or(-1),
                        String::from_utf8_lossy(&output.stderr).trim()
                    )));
                }

                Ok(parse_arp_listing(&String::from_utf8_lossy(&output.stdout)))
            }
            NeighborSource::ProcNetArp { path } => {
                let text = tokio::fs::read_to_string(path).await?;
                Ok(parse_proc_net_arp(&text))
            }
        }
    }
}

#[async_trait]
impl NeighborReader for SystemNeighborReader {
    async fn read(&self) -> NeighborLookup {
        match self.read_raw().await {
            Ok(table) => {
                tracing::debug!(entries = table.len(), source = ?self.source, "Neighbor table read");
                NeighborLookup::Table(table)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    source = ?self.source,
                    "Neighbor table read failed, treating as empty"
                );
                NeighborLookup::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// False for broadcast (`x.x.x.255`, `255.255.255.255`) and the multicast
/// prefixes `224.` and `239.`.
pub fn is_host_entry(ip: Ipv4Addr) -> bool {
    let [first, _, _, last] = ip.octets();
    !(last == 255 || first == 224 || first == 239 || ip == Ipv4Addr::BROADCAST)
}

fn windows_entry() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,3}(?:\.\d{1,3}){3})\s+([0-9a-f]{2}(?:[-:][0-9a-f]{2}){5})\b")
            .expect("static neighbor pattern")
    })
}

fn bsd_entry() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\((\d{1,3}(?:\.\d{1,3}){3})\)\s+at\s+([0-9a-f]{1,2}(?::[0-9a-f]{1,2}){5})\b")
            .expect("static neighbor pattern")
    })
}

/// Parse `arp -a` text.
///
/// Matches the Windows layout (`192.168.1.1   aa-bb-cc-dd-ee-ff   dynamic`)
/// and the BSD/macOS layout (`? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0`).
/// Interface headers, incomplete entries and anything else are skipped.
pub fn parse_arp_listing(text: &str) -> NeighborTable {
    let mut table = NeighborTable::new();

    for pattern in [windows_entry(), bsd_entry()] {
        for caps in pattern.captures_iter(text) {
            insert_entry(&mut table, &caps[1], &caps[2]);
        }
    }

    table
}

/// Parse the Linux `/proc/net/arp` table.
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
pub fn parse_proc_net_arp(text: &str) -> NeighborTable {
    let mut table = NeighborTable::new();

    for line in text.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        // Flags 0x0: resolution in progress or failed.
        if fields[2] == "0x0" {
            continue;
        }
        insert_entry(&mut table, fields[0], fields[3]);
    }

    table
}

fn insert_entry(table: &mut NeighborTable, ip: &str, mac: &str) {
    let Ok(ip) = ip.parse::<Ipv4Addr>() else {
        return;
    };
    let Ok(mac) = mac.parse::<HardwareAddress>() else {
        return;
    };
    if mac.is_zero() || !is_host_entry(ip) {
        return;
    }
    table.insert(ip, mac);
}
