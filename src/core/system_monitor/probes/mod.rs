//! Platform probes producing raw resource readings.
//!
//! CPU and memory come from a [`PlatformProbe`] strategy chosen once at
//! startup. Disks and network interfaces have their own probes because their
//! sources do not depend on the strategy family.

mod counters;
mod disks;
mod network;
mod procfs;

pub use counters::CounterProbe;
pub use disks::{DiskProbe, SysinfoDiskProbe};
pub use network::{
    bandwidth_usage_pct, byte_rate, CounterSource, InterfaceCounters, InterfaceMonitor,
    NetworkProbe, PingSettings, SysinfoCounters,
};
pub use procfs::ProcfsProbe;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySample {
    pub total_bytes: u64,
    /// Available to new allocations (free plus reclaimable cache where the platform reports it)
    pub free_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskSample {
    pub name: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkSample {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_rate: f64,
    pub recv_rate: f64,
    pub packet_loss_pct: f64,
    pub latency_ms: f64,
    pub is_connected: bool,
    pub bandwidth_usage_pct: f64,
}

/// CPU and memory sampling strategy for one platform family.
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Instantaneous CPU usage over a short sampling window, in percent (unclamped).
    async fn sample_cpu(&self) -> Result<f64>;

    async fn sample_memory(&self) -> Result<MemorySample>;
}

/// Select the CPU/memory strategy for the detected platform.
///
/// A procfs probe that cannot be set up falls back to native counters.
pub fn select_platform_probe(platform: Platform, cpu_window: Duration) -> Box<dyn PlatformProbe> {
    match platform {
        Platform::Procfs => match ProcfsProbe::new(cpu_window) {
            Ok(probe) => Box::new(probe),
            Err(e) => {
                log::warn!("procfs probe unavailable, using native counters: {}", e);
                Box::new(CounterProbe::new(cpu_window))
            }
        },
        Platform::Counters => Box::new(CounterProbe::new(cpu_window)),
    }
}
