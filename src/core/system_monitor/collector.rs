use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;

use crate::core::config::{keys, Settings};
use crate::platform::Platform;

use super::aggregator::build_snapshot;
use super::metrics::Snapshot;
use super::probes::{
    select_platform_probe, DiskProbe, DiskSample, InterfaceMonitor, MemorySample, NetworkProbe,
    NetworkSample, PingSettings, PlatformProbe, SysinfoDiskProbe,
};
use super::runtime::panic_message;

/// Configuration for metrics collection
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Gap between the two CPU reads of one sample
    pub cpu_window: Duration,
    pub ping: PingSettings,
    /// Link capacity assumed when the OS does not report a speed
    pub link_capacity_mbps: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            cpu_window: Duration::from_secs(1),
            ping: PingSettings::default(),
            link_capacity_mbps: 1_000,
        }
    }
}

impl CollectorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = PingSettings::default();

        Self {
            ping: PingSettings {
                target: settings
                    .text(keys::ENGINE_PING_TARGET)
                    .unwrap_or(defaults.target),
                count: settings.int(keys::ENGINE_PING_COUNT) as u32,
                timeout: Duration::from_millis(settings.int(keys::ENGINE_PING_TIMEOUT_MS) as u64),
                spacing: Duration::from_millis(settings.int(keys::ENGINE_PING_SPACING_MS) as u64),
            },
            link_capacity_mbps: settings.int(keys::NETWORK_LINK_CAPACITY_MBPS) as u64,
            ..Self::default()
        }
    }
}

/// Runs every probe for one cycle and aggregates the result.
///
/// A failing or panicking probe never fails the collection: its reading
/// degrades to zero (or an empty list) and a warning is logged.
pub struct MetricsCollector {
    platform: Box<dyn PlatformProbe>,
    disks: Box<dyn DiskProbe>,
    network: Box<dyn NetworkProbe>,
}

impl MetricsCollector {
    /// Create a collector for the detected platform
    pub fn new(config: &CollectorConfig) -> Self {
        let platform = Platform::detect();
        log::info!("Using {} probes", platform.name());

        Self::with_probes(
            select_platform_probe(platform, config.cpu_window),
            Box::new(SysinfoDiskProbe::new()),
            Box::new(InterfaceMonitor::new(
                config.ping.clone(),
                config.link_capacity_mbps,
            )),
        )
    }

    pub fn with_probes(
        platform: Box<dyn PlatformProbe>,
        disks: Box<dyn DiskProbe>,
        network: Box<dyn NetworkProbe>,
    ) -> Self {
        Self {
            platform,
            disks,
            network,
        }
    }

    pub fn platform_name(&self) -> &'static str {
        self.platform.name()
    }

    /// Sample every resource concurrently and build the cycle's snapshot.
    pub async fn collect(&self, now: DateTime<Utc>) -> Snapshot {
        let (cpu, memory, disks, networks) = tokio::join!(
            self.sample_cpu(now),
            self.sample_memory(now),
            self.sample_disks(now),
            self.sample_networks(now),
        );

        build_snapshot(cpu, &memory, &disks, &networks, now)
    }

    async fn sample_cpu(&self, cycle: DateTime<Utc>) -> f64 {
        match AssertUnwindSafe(self.platform.sample_cpu()).catch_unwind().await {
            Ok(Ok(usage)) => usage,
            Ok(Err(e)) => {
                log::warn!("[{}] CPU probe ({}) failed: {}", cycle, self.platform.name(), e);
                0.0
            }
            Err(panic) => {
                log::warn!(
                    "[{}] CPU probe ({}) panicked: {}",
                    cycle,
                    self.platform.name(),
                    panic_message(panic.as_ref())
                );
                0.0
            }
        }
    }

    async fn sample_memory(&self, cycle: DateTime<Utc>) -> MemorySample {
        match AssertUnwindSafe(self.platform.sample_memory()).catch_unwind().await {
            Ok(Ok(memory)) => memory,
            Ok(Err(e)) => {
                log::warn!("[{}] Memory probe ({}) failed: {}", cycle, self.platform.name(), e);
                MemorySample::default()
            }
            Err(panic) => {
                log::warn!(
                    "[{}] Memory probe ({}) panicked: {}",
                    cycle,
                    self.platform.name(),
                    panic_message(panic.as_ref())
                );
                MemorySample::default()
            }
        }
    }

    async fn sample_disks(&self, cycle: DateTime<Utc>) -> Vec<DiskSample> {
        match AssertUnwindSafe(self.disks.sample_disks()).catch_unwind().await {
            Ok(Ok(disks)) => disks,
            Ok(Err(e)) => {
                log::warn!("[{}] Disk probe failed: {}", cycle, e);
                Vec::new()
            }
            Err(panic) => {
                log::warn!("[{}] Disk probe panicked: {}", cycle, panic_message(panic.as_ref()));
                Vec::new()
            }
        }
    }

    async fn sample_networks(&self, cycle: DateTime<Utc>) -> Vec<NetworkSample> {
        AssertUnwindSafe(self.network.sample_networks())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                log::warn!("[{}] Network probe panicked: {}", cycle, panic_message(panic.as_ref()));
                Vec::new()
            })
    }
}
