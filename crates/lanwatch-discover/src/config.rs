//! Configuration for the lanwatch discovery daemon.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{DiscoverError, Result};

/// Top-level discover configuration.
///
/// Loaded from `lanwatch.toml` `[discover]` section or
/// `LANWATCH_DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Range to sweep (e.g., "192.168.1.0/24"). Only the first three
    /// octets are used.
    #[serde(default = "default_network_range")]
    pub network_range: String,

    /// Seconds to sleep between the end of one scan and the start of the next.
    #[serde(default = "default_interval")]
    pub scan_interval_secs: u64,

    /// Maximum probes in flight at once.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Per-address probe deadline.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Per-address reverse lookup deadline.
    #[serde(default = "default_hostname_timeout_ms")]
    pub hostname_timeout_ms: u64,

    /// Where neighbor table entries are read from.
    #[serde(default)]
    pub neighbor_source: NeighborSourceKind,

    /// Program used by the `arp` neighbor source.
    #[serde(default = "default_arp_program")]
    pub arp_program: String,

    /// JSON object mapping hardware addresses or hostnames to display names.
    #[serde(default = "default_aliases_path")]
    pub aliases_path: String,

    /// JSON list or object of hardware addresses muted from notifications.
    #[serde(default = "default_excluded_path")]
    pub excluded_macs_path: String,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Neighbor table backend selection.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NeighborSourceKind {
    /// `/proc/net/arp` on Linux, the `arp` command elsewhere.
    #[default]
    Auto,
    /// Parse `arp -a` output.
    Arp,
    /// Read `/proc/net/arp`.
    Proc,
}

/// Telegram Bot API notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,

    pub bot_token: Option<String>,

    pub chat_id: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,
}

impl DiscoverConfig {
    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(DiscoverError::Config(
                "scan_interval_secs must be a positive number of seconds".to_string(),
            ));
        }
        if self.probe_concurrency == 0 {
            return Err(DiscoverError::Config(
                "probe_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn hostname_timeout(&self) -> Duration {
        Duration::from_millis(self.hostname_timeout_ms)
    }
}

fn default_network_range() -> String {
    "192.168.1.0/24".to_string()
}

fn default_interval() -> u64 {
    15
}

fn default_probe_concurrency() -> usize {
    50
}

fn default_probe_timeout_ms() -> u64 {
    100
}

fn default_hostname_timeout_ms() -> u64 {
    1000
}

fn default_arp_program() -> String {
    "arp".to_string()
}

fn default_aliases_path() -> String {
    "aliases.json".to_string()
}

fn default_excluded_path() -> String {
    "excluded_macs.json".to_string()
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout() -> u64 {
    10
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            network_range: default_network_range(),
            scan_interval_secs: default_interval(),
            probe_concurrency: default_probe_concurrency(),
            probe_timeout_ms: default_probe_timeout_ms(),
            hostname_timeout_ms: default_hostname_timeout_ms(),
            neighbor_source: NeighborSourceKind::default(),
            arp_program: default_arp_program(),
            aliases_path: default_aliases_path(),
            excluded_macs_path: default_excluded_path(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_id: None,
            api_base: default_api_base(),
            timeout_secs: default_telegram_timeout(),
        }
    }
}
