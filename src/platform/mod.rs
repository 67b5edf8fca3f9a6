// Platform-specific code module

pub mod netif;
pub mod ping;
pub mod procfs;

use std::path::Path;

// Re-exports para imports limpios
pub use netif::{classify_interface, InterfaceKind};
pub use ping::{EchoProber, SystemPing};
pub use procfs::{parse_cpu_times, parse_meminfo, CpuTimes, MemInfo, PROC_ROOT};

/// Measurement strategy family available on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Pseudo-filesystem statistics (`/proc/stat`, `/proc/meminfo`).
    Procfs,
    /// Native performance counters queried through `sysinfo`.
    Counters,
}

impl Platform {
    /// Detect the strategy family once at startup.
    pub fn detect() -> Self {
        Self::detect_at(Path::new(PROC_ROOT))
    }

    pub fn detect_at(proc_root: &Path) -> Self {
        let readable = |name: &str| std::fs::File::open(proc_root.join(name)).is_ok();

        if readable("stat") && readable("meminfo") {
            Platform::Procfs
        } else {
            Platform::Counters
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Procfs => "procfs",
            Platform::Counters => "counters",
        }
    }
}
