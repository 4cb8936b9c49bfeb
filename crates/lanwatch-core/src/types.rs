//! Core domain types for lanwatch.
//!
//! A scan produces a [`Snapshot`]: every device seen in the neighbor table,
//! keyed by its hardware address. IP addresses are not stable across DHCP
//! renewals, so the hardware address is the durable device identity.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Subnet ────────────────────────────────────────────────────────

/// Prefix length of every swept range. Any other `/NN` suffix in the
/// configured descriptor is accepted but ignored.
pub const SWEEP_PREFIX_LEN: u8 = 24;

/// The /24 range swept on every scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: Ipv4Net,
    declared_prefix: Option<u8>,
}

impl Subnet {
    /// Parse a descriptor of the form `A.B.C.x[/NN]`.
    ///
    /// Only the leading three octets are consumed. A fourth component must be
    /// present (`192.168.1` is rejected, `192.168.1.0/24` and `192.168.1.7`
    /// are accepted).
    pub fn parse(descriptor: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidSubnet {
            input: descriptor.to_string(),
        };

        let trimmed = descriptor.trim();
        let mut parts = trimmed.splitn(4, '.');
        let mut octets = [0u8; 3];
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *octet = part.parse().map_err(|_| invalid())?;
        }
        if parts.next().is_none() {
            return Err(invalid());
        }

        let declared_prefix = trimmed
            .split_once('/')
            .and_then(|(_, suffix)| suffix.trim().parse::<u8>().ok());

        let base = Ipv4Addr::new(octets[0], octets[1], octets[2], 0);
        let network = Ipv4Net::new(base, SWEEP_PREFIX_LEN).map_err(|_| invalid())?;

        Ok(Self {
            network,
            declared_prefix,
        })
    }

    /// The three-octet base prefix, e.g. `192.168.1`.
    pub fn base(&self) -> String {
        let [a, b, c, _] = self.network.network().octets();
        format!("{a}.{b}.{c}")
    }

    /// Prefix length written in the descriptor, if any.
    pub fn declared_prefix(&self) -> Option<u8> {
        self.declared_prefix
    }

    /// True when the descriptor asked for a prefix other than /24.
    pub fn prefix_ignored(&self) -> bool {
        matches!(self.declared_prefix, Some(p) if p != SWEEP_PREFIX_LEN)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.network.contains(&ip)
    }

    /// Host addresses `base.1` through `base.254`, ascending.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        self.network.hosts()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

impl FromStr for Subnet {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Hardware address ──────────────────────────────────────────────

/// A 6-byte link-layer address, rendered `aa:bb:cc:dd:ee:ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// `00:00:00:00:00:00`, reported by some platforms for incomplete entries.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl FromStr for HardwareAddress {
    type Err = CoreError;

    /// Accepts `-` or `:` separators, any case, and one or two hex digits per
    /// group (BSD `arp` drops leading zeros).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidHardwareAddress(s.to_string());

        let mut octets = [0u8; 6];
        let mut groups = s.trim().split([':', '-']);
        for octet in octets.iter_mut() {
            let group = groups.next().ok_or_else(invalid)?;
            if group.is_empty() || group.len() > 2 || !group.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| invalid())?;
        }
        if groups.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl TryFrom<String> for HardwareAddress {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HardwareAddress> for String {
    fn from(value: HardwareAddress) -> Self {
        value.to_string()
    }
}

// ── Hostname ──────────────────────────────────────────────────────

/// Display text for a device whose reverse lookup failed or timed out.
pub const UNKNOWN_HOSTNAME: &str = "Unknown";

/// Outcome of a best-effort reverse name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "name", rename_all = "snake_case")]
pub enum Hostname {
    Resolved(String),
    #[default]
    Unknown,
}

impl Hostname {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resolved(name) => name,
            Self::Unknown => UNKNOWN_HOSTNAME,
        }
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Device / Snapshot ─────────────────────────────────────────────

/// A host observed in the neighbor table during one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub ip: Ipv4Addr,
    pub mac: HardwareAddress,
    pub hostname: Hostname,
}

impl Device {
    pub fn new(ip: Ipv4Addr, mac: HardwareAddress, hostname: Hostname) -> Self {
        Self { ip, mac, hostname }
    }
}

/// Every device seen in one scan, keyed by hardware address.
///
/// Built once per scan and never mutated afterwards. When two devices share
/// a hardware address the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    devices: BTreeMap<HardwareAddress, Device>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, mac: &HardwareAddress) -> Option<&Device> {
        self.devices.get(mac)
    }

    pub fn contains(&self, mac: &HardwareAddress) -> bool {
        self.devices.contains_key(mac)
    }

    pub fn keys(&self) -> impl Iterator<Item = &HardwareAddress> {
        self.devices.keys()
    }

    /// Devices in hardware-address order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Devices sorted by IP address, for display.
    pub fn by_ip(&self) -> Vec<&Device> {
        let mut devices: Vec<&Device> = self.devices.values().collect();
        devices.sort_by_key(|d| d.ip);
        devices
    }
}

impl FromIterator<Device> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        let devices = iter.into_iter().map(|d| (d.mac, d)).collect();
        Self { devices }
    }
}
