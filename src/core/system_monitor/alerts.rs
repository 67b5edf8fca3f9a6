//! Alert evaluation against configurable thresholds.
//!
//! A snapshot breaches when CPU, memory or any single disk reaches its
//! threshold. Breaches of any kind share one global cooldown window.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use super::metrics::Snapshot;
use super::notify::Notifier;
use super::runtime::panic_message;
use crate::core::config::{keys, Settings};

/// Alert configuration with thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Minimum minutes between two fired alerts
    pub interval_minutes: u32,
    pub cpu_threshold: u8,    // (%)
    pub memory_threshold: u8, // (%)
    pub disk_threshold: u8,   // (%)
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 15,
            cpu_threshold: 90,
            memory_threshold: 90,
            disk_threshold: 90,
        }
    }
}

impl AlertConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.bool(keys::ALERTS_ENABLED),
            interval_minutes: settings.int(keys::ALERTS_INTERVAL_MINUTES) as u32,
            cpu_threshold: settings.int(keys::ALERTS_CPU_THRESHOLD) as u8,
            memory_threshold: settings.int(keys::ALERTS_MEMORY_THRESHOLD) as u8,
            disk_threshold: settings.int(keys::ALERTS_DISK_THRESHOLD) as u8,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }
}

/// One threshold condition met by a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Breach {
    Cpu { value: f64, threshold: u8 },
    Memory { value: f64, threshold: u8 },
    Disk { name: String, value: f64, threshold: u8 },
}

impl std::fmt::Display for Breach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breach::Cpu { value, threshold } => {
                write!(f, "CPU usage at {:.1}% (threshold: {}%)", value, threshold)
            }
            Breach::Memory { value, threshold } => {
                write!(f, "Memory usage at {:.1}% (threshold: {}%)", value, threshold)
            }
            Breach::Disk {
                name,
                value,
                threshold,
            } => write!(
                f,
                "Disk {} at {:.1}% capacity (threshold: {}%)",
                name, value, threshold
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Disabled,
    NoBreach,
    Cooldown { remaining: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Fire(Vec<Breach>),
    Suppress(SuppressReason),
}

impl Decision {
    pub fn is_fire(&self) -> bool {
        matches!(self, Decision::Fire(_))
    }
}

/// Thresholds are inclusive: a value equal to its threshold breaches.
pub fn find_breaches(snapshot: &Snapshot, config: &AlertConfig) -> Vec<Breach> {
    let mut breaches = Vec::new();

    if snapshot.cpu_usage_pct >= f64::from(config.cpu_threshold) {
        breaches.push(Breach::Cpu {
            value: snapshot.cpu_usage_pct,
            threshold: config.cpu_threshold,
        });
    }

    if snapshot.memory.usage_pct >= f64::from(config.memory_threshold) {
        breaches.push(Breach::Memory {
            value: snapshot.memory.usage_pct,
            threshold: config.memory_threshold,
        });
    }

    for disk in &snapshot.disks {
        let usage = disk.usage_pct();
        if usage >= f64::from(config.disk_threshold) {
            breaches.push(Breach::Disk {
                name: disk.name.clone(),
                value: usage,
                threshold: config.disk_threshold,
            });
        }
    }

    breaches
}

/// Decide whether a snapshot fires an alert. On `Fire` the caller records `now`
/// as the new last alert time.
pub fn evaluate(
    snapshot: &Snapshot,
    config: &AlertConfig,
    last_alert_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Decision {
    if !config.enabled {
        return Decision::Suppress(SuppressReason::Disabled);
    }

    let breaches = find_breaches(snapshot, config);
    if breaches.is_empty() {
        return Decision::Suppress(SuppressReason::NoBreach);
    }

    if let Some(last) = last_alert_time {
        let elapsed = now - last;
        if elapsed < config.cooldown() {
            return Decision::Suppress(SuppressReason::Cooldown {
                remaining: config.cooldown() - elapsed,
            });
        }
    }

    Decision::Fire(breaches)
}

/// Result of one `AlertEvaluator::process` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Suppressed,
    Delivered,
    /// Fired but the notifier failed; the cooldown is still consumed
    DeliveryFailed,
}

/// Owns the last alert time and drives the notifier on `Fire`.
pub struct AlertEvaluator {
    notifier: Arc<dyn Notifier>,
    last_alert_time: Option<DateTime<Utc>>,
}

impl AlertEvaluator {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            last_alert_time: None,
        }
    }

    pub fn last_alert_time(&self) -> Option<DateTime<Utc>> {
        self.last_alert_time
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = notifier;
    }

    pub async fn process(
        &mut self,
        snapshot: &Snapshot,
        config: &AlertConfig,
        now: DateTime<Utc>,
    ) -> AlertOutcome {
        let breaches = match evaluate(snapshot, config, self.last_alert_time, now) {
            Decision::Fire(breaches) => breaches,
            Decision::Suppress(SuppressReason::Cooldown { remaining }) => {
                log::debug!(
                    "[{}] Alert suppressed, cooldown active for {}s",
                    now,
                    remaining.num_seconds()
                );
                return AlertOutcome::Suppressed;
            }
            Decision::Suppress(_) => return AlertOutcome::Suppressed,
        };

        // Recorded before delivery so a failed send still consumes the window
        self.last_alert_time = Some(now);

        for breach in &breaches {
            log::warn!("[{}] {}", now, breach);
        }

        match AssertUnwindSafe(self.notifier.notify(snapshot)).catch_unwind().await {
            Ok(Ok(())) => {
                log::info!("[{}] Alert notification sent", now);
                AlertOutcome::Delivered
            }
            Ok(Err(e)) => {
                log::error!("[{}] Alert notification failed: {}", now, e);
                AlertOutcome::DeliveryFailed
            }
            Err(panic) => {
                log::error!(
                    "[{}] Alert notifier panicked: {}",
                    now,
                    panic_message(panic.as_ref())
                );
                AlertOutcome::DeliveryFailed
            }
        }
    }
}
