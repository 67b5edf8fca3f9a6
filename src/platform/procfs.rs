//! Parsers for Linux pseudo-filesystem statistics.

use crate::error::{MonitorError, Result};

pub const PROC_ROOT: &str = "/proc";

/// Cumulative jiffies from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
}

impl CpuTimes {
    pub fn busy(&self) -> u64 {
        self.user.saturating_add(self.nice).saturating_add(self.system)
    }

    pub fn total(&self) -> u64 {
        self.busy().saturating_add(self.idle)
    }

    /// Busy share of the interval between `earlier` and `self`, in percent.
    ///
    /// Counters that went backwards (or did not move) yield 0.
    pub fn usage_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total().saturating_sub(earlier.total());
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy().saturating_sub(earlier.busy());
        busy as f64 * 100.0 / total as f64
    }
}

/// Memory figures from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
}

impl MemInfo {
    /// Free plus reclaimable buffers and page cache.
    pub fn effectively_free_kb(&self) -> u64 {
        self.free_kb
            .saturating_add(self.buffers_kb)
            .saturating_add(self.cached_kb)
    }
}

pub fn parse_cpu_times(content: &str) -> Result<CpuTimes> {
    let line = content
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| MonitorError::probe("cpu", "no aggregate cpu line in stat"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(4)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| MonitorError::probe("cpu", format!("bad counter '{field}': {e}")))
        })
        .collect::<Result<_>>()?;

    if fields.len() < 4 {
        return Err(MonitorError::probe(
            "cpu",
            format!("expected 4 counters, found {}", fields.len()),
        ));
    }

    Ok(CpuTimes {
        user: fields[0],
        nice: fields[1],
        system: fields[2],
        idle: fields[3],
    })
}

pub fn parse_meminfo(content: &str) -> Result<MemInfo> {
    let mut info = MemInfo::default();
    let mut saw_total = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        match key.trim() {
            "MemTotal" => {
                info.total_kb = value;
                saw_total = true;
            }
            "MemFree" => info.free_kb = value,
            "Buffers" => info.buffers_kb = value,
            "Cached" => info.cached_kb = value,
            _ => {}
        }
    }

    if !saw_total {
        return Err(MonitorError::probe("memory", "MemTotal missing from meminfo"));
    }

    Ok(info)
}
