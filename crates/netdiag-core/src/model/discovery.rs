// ── Discovery domain types ──

use serde::{Deserialize, Serialize};

/// A candidate controller found by a subnet scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub ip: String,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub model: Option<String>,
    pub device_type: Option<String>,
    pub version: Option<String>,
}

impl DiscoveredDevice {
    /// Best human label: hostname when known, else the address.
    pub fn label(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.ip)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub devices: Vec<DiscoveredDevice>,
    pub scan_duration_ms: u64,
}
