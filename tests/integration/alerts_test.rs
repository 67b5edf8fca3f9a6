use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use sysmon::core::system_monitor::{
    evaluate, AlertConfig, AlertEvaluator, AlertOutcome, Decision, DiskReading, MemoryReading,
    NetworkReading, Notifier, Snapshot, SuppressReason,
};
use sysmon::NotifyError;

fn critical_snapshot(at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        timestamp: at,
        cpu_usage_pct: 95.0,
        memory: MemoryReading {
            total_gb: 16.0,
            used_gb: 14.72,
            free_gb: 1.28,
            usage_pct: 92.0,
        },
        disks: vec![DiskReading {
            name: "/".to_string(),
            total_gb: 500.0,
            used_gb: 475.0,
            free_gb: 25.0,
        }],
        networks: vec![NetworkReading {
            name: "eth0".to_string(),
            packet_loss_pct: 25.0,
            latency_ms: 600.0,
            is_connected: true,
            ..Default::default()
        }],
    }
}

fn enabled_config() -> AlertConfig {
    AlertConfig {
        enabled: true,
        interval_minutes: 15,
        cpu_threshold: 90,
        memory_threshold: 90,
        disk_threshold: 90,
    }
}

#[derive(Default)]
struct RecordingNotifier {
    received: Mutex<Vec<DateTime<Utc>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, snapshot: &Snapshot) -> Result<(), NotifyError> {
        self.received.lock().push(snapshot.timestamp);
        Ok(())
    }
}

#[test]
fn test_end_to_end_fire_then_suppress() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let config = enabled_config();
    let snapshot = critical_snapshot(t0);

    assert!(snapshot.is_cpu_critical());
    assert!(snapshot.is_memory_critical());
    assert!(snapshot.has_critical_disk());
    assert!(snapshot.has_critical_network());

    match evaluate(&snapshot, &config, None, t0) {
        Decision::Fire(breaches) => assert_eq!(breaches.len(), 3),
        other => panic!("expected Fire, got {other:?}"),
    }

    let later = t0 + Duration::minutes(5);
    assert!(matches!(
        evaluate(&critical_snapshot(later), &config, Some(t0), later),
        Decision::Suppress(SuppressReason::Cooldown { .. })
    ));
}

#[test]
fn test_disabled_suppresses_any_magnitude() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let config = AlertConfig {
        enabled: false,
        interval_minutes: 0,
        cpu_threshold: 0,
        memory_threshold: 0,
        disk_threshold: 0,
    };

    assert_eq!(
        evaluate(&critical_snapshot(t0), &config, None, t0),
        Decision::Suppress(SuppressReason::Disabled)
    );
}

#[tokio::test]
async fn test_evaluator_respects_cooldown_across_cycles() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut evaluator = AlertEvaluator::new(notifier.clone());
    let config = enabled_config();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    let mut outcomes = Vec::new();
    for minutes in [0, 10, 16, 20, 31] {
        let now = t0 + Duration::minutes(minutes);
        outcomes.push(evaluator.process(&critical_snapshot(now), &config, now).await);
    }

    assert_eq!(
        outcomes,
        vec![
            AlertOutcome::Delivered,
            AlertOutcome::Suppressed,
            AlertOutcome::Delivered,
            AlertOutcome::Suppressed,
            AlertOutcome::Delivered,
        ]
    );
    assert_eq!(
        *notifier.received.lock(),
        vec![
            t0,
            t0 + Duration::minutes(16),
            t0 + Duration::minutes(31)
        ]
    );
}
