//! Display aliases and notification exclusions.
//!
//! Both lists are loaded once at startup and shared read-only with the
//! notifier and the console presenter.

use std::collections::HashMap;
use std::path::Path;

use lanwatch_core::{Device, HardwareAddress};
use serde_json::Value;

/// Reason recorded for exclusions given as a plain list.
const DEFAULT_EXCLUSION_REASON: &str = "Excluded";

#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    aliases: HashMap<String, String>,
    excluded: HashMap<String, String>,
}

impl DeviceDirectory {
    pub fn new(aliases: HashMap<String, String>, excluded: HashMap<String, String>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (normalize_key(&k), v))
                .collect(),
            excluded: excluded
                .into_iter()
                .map(|(k, v)| (normalize_key(&k), v))
                .collect(),
        }
    }

    /// Load both files. Missing files yield empty lists; unreadable or
    /// malformed files are logged and yield empty lists.
    pub fn load(aliases_path: impl AsRef<Path>, excluded_path: impl AsRef<Path>) -> Self {
        let aliases = read_json(aliases_path.as_ref())
            .map(|v| parse_aliases(aliases_path.as_ref(), v))
            .unwrap_or_default();
        let excluded = read_json(excluded_path.as_ref())
            .map(|v| parse_exclusions(excluded_path.as_ref(), v))
            .unwrap_or_default();

        tracing::info!(
            aliases = aliases.len(),
            excluded = excluded.len(),
            "Device directory loaded"
        );

        Self::new(aliases, excluded)
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn exclusion_count(&self) -> usize {
        self.excluded.len()
    }

    /// Preferred name: hardware address alias, then hostname alias, then the
    /// hostname unchanged.
    pub fn display_name(&self, hostname: &str, mac: Option<&HardwareAddress>) -> String {
        mac.and_then(|m| self.aliases.get(&m.to_string()))
            .or_else(|| self.aliases.get(&normalize_key(hostname)))
            .cloned()
            .unwrap_or_else(|| hostname.to_string())
    }

    pub fn device_name(&self, device: &Device) -> String {
        self.display_name(device.hostname.as_str(), Some(&device.mac))
    }

    /// The exclusion reason, if `mac` is muted from notifications.
    pub fn exclusion(&self, mac: &HardwareAddress) -> Option<&str> {
        self.excluded.get(&mac.to_string()).map(String::as_str)
    }

    pub fn is_excluded(&self, mac: &HardwareAddress) -> bool {
        self.exclusion(mac).is_some()
    }
}

/// Trim, lowercase, drop trailing colons, and canonicalize hardware
/// addresses to colon form.
fn normalize_key(key: &str) -> String {
    let key = key.trim().to_lowercase();
    let key = key.trim_end_matches(':');
    match key.parse::<HardwareAddress>() {
        Ok(mac) => mac.to_string(),
        Err(_) => key.to_string(),
    }
}

fn read_json(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read directory file");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse directory file");
            None
        }
    }
}

fn parse_aliases(path: &Path, value: Value) -> HashMap<String, String> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(name) => Some((k, name)),
                other => {
                    tracing::warn!(key = %k, value = %other, "Alias is not a string, skipping");
                    None
                }
            })
            .collect(),
        _ => {
            tracing::warn!(path = %path.display(), "Alias file should be a JSON object");
            HashMap::new()
        }
    }
}

fn parse_exclusions(path: &Path, value: Value) -> HashMap<String, String> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| {
                let reason = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, reason)
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(mac) => Some((mac, DEFAULT_EXCLUSION_REASON.to_string())),
                _ => None,
            })
            .collect(),
        _ => {
            tracing::warn!(
                path = %path.display(),
                "Exclusion file should be a JSON list or object"
            );
            HashMap::new()
        }
    }
}
