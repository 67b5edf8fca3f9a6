//! Native performance counters via `sysinfo`.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::{MemorySample, PlatformProbe};
use crate::error::{MonitorError, Result};

/// Counter-based strategy.
///
/// The first CPU reading after a refresh is meaningless, so every sample
/// refreshes twice with the window in between and keeps the second value.
pub struct CounterProbe {
    system: Mutex<System>,
    cpu_window: Duration,
}

impl CounterProbe {
    pub fn new(cpu_window: Duration) -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            system: Mutex::new(System::new_with_specifics(refresh_kind)),
            // sysinfo cannot compute usage faster than this
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

#[async_trait]
impl PlatformProbe for CounterProbe {
    fn name(&self) -> &'static str {
        "counters"
    }

    async fn sample_cpu(&self) -> Result<f64> {
        self.system.lock().refresh_cpu_usage();
        tokio::time::sleep(self.cpu_window).await;

        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        Ok(system.global_cpu_usage() as f64)
    }

    async fn sample_memory(&self) -> Result<MemorySample> {
        let mut system = self.system.lock();
        system.refresh_memory();

        let total_bytes = system.total_memory();
        if total_bytes == 0 {
            return Err(MonitorError::probe("memory", "total physical memory unavailable"));
        }

        Ok(MemorySample {
            total_bytes,
            free_bytes: system.available_memory(),
        })
    }
}

impl Drop for CounterProbe {
    fn drop(&mut self) {
        log::debug!("Releasing native counter handles");
    }
}
