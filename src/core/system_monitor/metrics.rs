use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregator::percent_of;

/// Display threshold for cpu, memory, disk and bandwidth usage (%).
pub const CRITICAL_USAGE_PERCENT: f64 = 90.0;
/// Display threshold for packet loss (%).
pub const CRITICAL_PACKET_LOSS_PERCENT: f64 = 20.0;
/// Display threshold for round-trip latency (ms).
pub const CRITICAL_LATENCY_MS: f64 = 500.0;

/// One immutable observation of host resource state.
///
/// Field names on the wire are lower camel case; memory figures are
/// flattened into the top level object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "cpuUsagePercentage")]
    pub cpu_usage_pct: f64,
    #[serde(flatten)]
    pub memory: MemoryReading,
    #[serde(rename = "diskMetrics", default)]
    pub disks: Vec<DiskReading>,
    #[serde(rename = "networkMetrics", default)]
    pub networks: Vec<NetworkReading>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    #[serde(rename = "totalMemoryGB")]
    pub total_gb: f64,
    #[serde(rename = "usedMemoryGB")]
    pub used_gb: f64,
    #[serde(rename = "freeMemoryGB")]
    pub free_gb: f64,
    #[serde(rename = "memoryUsagePercentage")]
    pub usage_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskReading {
    #[serde(rename = "driveName")]
    pub name: String,
    #[serde(rename = "totalSpaceGB")]
    pub total_gb: f64,
    #[serde(rename = "usedSpaceGB")]
    pub used_gb: f64,
    #[serde(rename = "freeSpaceGB")]
    pub free_gb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReading {
    #[serde(rename = "interfaceName")]
    pub name: String,
    #[serde(rename = "bytesSent")]
    pub bytes_sent: u64,
    #[serde(rename = "bytesReceived")]
    pub bytes_received: u64,
    /// Bytes per second
    #[serde(rename = "sendSpeed")]
    pub send_rate: f64,
    /// Bytes per second
    #[serde(rename = "receiveSpeed")]
    pub recv_rate: f64,
    #[serde(rename = "packetLoss")]
    pub packet_loss_pct: f64,
    #[serde(rename = "latency")]
    pub latency_ms: f64,
    #[serde(rename = "isConnected")]
    pub is_connected: bool,
    #[serde(rename = "bandwidthUsagePercentage")]
    pub bandwidth_usage_pct: f64,
}

impl Snapshot {
    /// The zeroed snapshot served before the first cycle has published.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn is_cpu_critical(&self) -> bool {
        self.cpu_usage_pct > CRITICAL_USAGE_PERCENT
    }

    pub fn is_memory_critical(&self) -> bool {
        self.memory.usage_pct > CRITICAL_USAGE_PERCENT
    }

    pub fn has_critical_disk(&self) -> bool {
        self.disks.iter().any(DiskReading::is_critical)
    }

    pub fn has_critical_network(&self) -> bool {
        self.networks.iter().any(NetworkReading::is_critical)
    }

    pub fn has_critical_state(&self) -> bool {
        self.is_cpu_critical()
            || self.is_memory_critical()
            || self.has_critical_disk()
            || self.has_critical_network()
    }
}

impl DiskReading {
    /// Used space as a share of capacity; a zero-capacity volume reports 0.
    pub fn usage_pct(&self) -> f64 {
        percent_of(self.used_gb, self.total_gb)
    }

    pub fn is_critical(&self) -> bool {
        self.usage_pct() > CRITICAL_USAGE_PERCENT
    }
}

impl NetworkReading {
    pub fn is_critical(&self) -> bool {
        self.packet_loss_pct > CRITICAL_PACKET_LOSS_PERCENT
            || self.latency_ms > CRITICAL_LATENCY_MS
            || !self.is_connected
            || self.bandwidth_usage_pct > CRITICAL_USAGE_PERCENT
    }
}
