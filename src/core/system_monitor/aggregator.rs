//! Normalizes raw probe output into a [`Snapshot`].
//!
//! Everything here is pure: no I/O, no clocks. Byte counts become GiB and
//! every percentage is clamped into `[0, 100]` before it reaches the model.

use chrono::{DateTime, Utc};

use super::metrics::{DiskReading, MemoryReading, NetworkReading, Snapshot};
use super::probes::{DiskSample, MemorySample, NetworkSample};

pub const BYTES_PER_GIB: f64 = 1_073_741_824.0;

/// Clamp a percentage into `[0, 100]`; NaN collapses to 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// `part / whole * 100`, clamped, with a zero (or negative) denominator giving 0.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        clamp_percent(part / whole * 100.0)
    } else {
        0.0
    }
}

pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Build a snapshot from one cycle's probe output.
pub fn build_snapshot(
    cpu_pct: f64,
    memory: &MemorySample,
    disks: &[DiskSample],
    networks: &[NetworkSample],
    now: DateTime<Utc>,
) -> Snapshot {
    Snapshot {
        timestamp: now,
        cpu_usage_pct: clamp_percent(cpu_pct),
        memory: normalize_memory(memory),
        disks: disks.iter().map(normalize_disk).collect(),
        networks: networks.iter().map(normalize_network).collect(),
    }
}

fn normalize_memory(sample: &MemorySample) -> MemoryReading {
    let free = sample.free_bytes.min(sample.total_bytes);
    let used = sample.total_bytes - free;

    MemoryReading {
        total_gb: bytes_to_gib(sample.total_bytes),
        used_gb: bytes_to_gib(used),
        free_gb: bytes_to_gib(free),
        usage_pct: percent_of(used as f64, sample.total_bytes as f64),
    }
}

fn normalize_disk(sample: &DiskSample) -> DiskReading {
    let available = sample.available_bytes.min(sample.total_bytes);

    DiskReading {
        name: sample.name.clone(),
        total_gb: bytes_to_gib(sample.total_bytes),
        used_gb: bytes_to_gib(sample.total_bytes - available),
        free_gb: bytes_to_gib(available),
    }
}

fn normalize_network(sample: &NetworkSample) -> NetworkReading {
    NetworkReading {
        name: sample.name.clone(),
        bytes_sent: sample.bytes_sent,
        bytes_received: sample.bytes_received,
        send_rate: non_negative(sample.send_rate),
        recv_rate: non_negative(sample.recv_rate),
        packet_loss_pct: clamp_percent(sample.packet_loss_pct),
        latency_ms: non_negative(sample.latency_ms),
        is_connected: sample.is_connected,
        bandwidth_usage_pct: clamp_percent(sample.bandwidth_usage_pct),
    }
}
