//! File-based strategy reading `/proc/stat` and `/proc/meminfo`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::{MemorySample, PlatformProbe};
use crate::error::{MonitorError, Result};
use crate::platform::procfs::{parse_cpu_times, parse_meminfo, CpuTimes, PROC_ROOT};

pub struct ProcfsProbe {
    root: PathBuf,
    cpu_window: Duration,
}

impl ProcfsProbe {
    pub fn new(cpu_window: Duration) -> Result<Self> {
        Self::with_root(PROC_ROOT, cpu_window)
    }

    /// Build against an alternative proc root; fails when the statistics files are unreadable.
    pub fn with_root<P: AsRef<Path>>(root: P, cpu_window: Duration) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for name in ["stat", "meminfo"] {
            let path = root.join(name);
            std::fs::File::open(&path).map_err(|e| {
                MonitorError::setup(format!("cannot open {}: {}", path.display(), e))
            })?;
        }

        Ok(Self { root, cpu_window })
    }

    async fn read_cpu_times(&self) -> Result<CpuTimes> {
        let content = tokio::fs::read_to_string(self.root.join("stat"))
            .await
            .map_err(|e| MonitorError::probe("cpu", format!("reading stat: {e}")))?;
        parse_cpu_times(&content)
    }
}

#[async_trait]
impl PlatformProbe for ProcfsProbe {
    fn name(&self) -> &'static str {
        "procfs"
    }

    async fn sample_cpu(&self) -> Result<f64> {
        let earlier = self.read_cpu_times().await?;
        tokio::time::sleep(self.cpu_window).await;
        let later = self.read_cpu_times().await?;

        Ok(later.usage_since(&earlier))
    }

    async fn sample_memory(&self) -> Result<MemorySample> {
        let content = tokio::fs::read_to_string(self.root.join("meminfo"))
            .await
            .map_err(|e| MonitorError::probe("memory", format!("reading meminfo: {e}")))?;
        let info = parse_meminfo(&content)?;

        Ok(MemorySample {
            total_bytes: info.total_kb.saturating_mul(1024),
            free_bytes: info.effectively_free_kb().saturating_mul(1024),
        })
    }
}
