//! System monitoring core functionality.
//!
//! Probes sample CPU, memory, disks and network interfaces; the runtime turns
//! each round of samples into a [`Snapshot`], evaluates alerts against it and
//! distributes it to subscribers.

pub mod aggregator;
pub mod alerts;
mod collector;
pub mod distribution;
mod metrics;
pub mod notify;
pub mod probes;
mod runtime;

pub use aggregator::build_snapshot;
pub use alerts::{
    evaluate, find_breaches, AlertConfig, AlertEvaluator, AlertOutcome, Breach, Decision,
    SuppressReason,
};
pub use collector::{CollectorConfig, MetricsCollector};
pub use distribution::{
    snapshot_cell, DistributionHandle, Distributor, SnapshotPublisher, SnapshotReader,
    Subscription,
};
pub use metrics::{
    DiskReading, MemoryReading, NetworkReading, Snapshot, CRITICAL_LATENCY_MS,
    CRITICAL_PACKET_LOSS_PERCENT, CRITICAL_USAGE_PERCENT,
};
pub use notify::{
    notifier_from_settings, render_alert_report, LogNotifier, Notifier, WebhookNotifier,
};
pub use runtime::{EngineConfig, EngineHandle, EngineState, EngineStatus, MonitorEngine};
