use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sysmon::core::system_monitor::{Distributor, Snapshot};

fn snapshot(cpu: f64) -> Arc<Snapshot> {
    Arc::new(Snapshot {
        timestamp: Utc::now(),
        cpu_usage_pct: cpu,
        ..Default::default()
    })
}

#[test]
fn test_publish_without_subscribers_is_bounded() {
    let distributor = Distributor::default();
    let started = Instant::now();

    for cycle in 0..1_000 {
        assert_eq!(distributor.publish(snapshot(f64::from(cycle))), 0);
    }

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(distributor.get_latest().cpu_usage_pct, 999.0);
}

#[tokio::test]
async fn test_unresponsive_subscriber_does_not_block_others() {
    let distributor = Distributor::new(4);
    let handle = distributor.handle();

    // subscribed but never polled again
    let _stalled = handle.subscribe();

    let mut readers = Vec::new();
    for _ in 0..3 {
        let mut subscription = handle.subscribe();
        readers.push(tokio::spawn(async move {
            let mut last = 0.0;
            while let Some(snapshot) = subscription.next().await {
                last = snapshot.cpu_usage_pct;
                if last >= 100.0 {
                    break;
                }
            }
            last
        }));
    }

    let started = Instant::now();
    for cycle in 1..=100 {
        assert!(distributor.publish(snapshot(f64::from(cycle))) >= 1);
        tokio::task::yield_now().await;
    }
    assert!(started.elapsed() < Duration::from_secs(1));

    for reader in readers {
        let last = tokio::time::timeout(Duration::from_secs(5), reader)
            .await
            .expect("subscriber did not finish")
            .unwrap();
        assert_eq!(last, 100.0);
    }
}

#[tokio::test]
async fn test_late_subscriber_gets_latest_immediately() {
    let distributor = Distributor::default();
    distributor.publish(snapshot(55.0));

    let mut subscription = distributor.handle().subscribe();
    let first = tokio::time::timeout(Duration::from_millis(100), subscription.next())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.cpu_usage_pct, 55.0);
}

#[tokio::test]
async fn test_dropped_subscriber_is_forgotten() {
    let distributor = Distributor::default();
    let handle = distributor.handle();

    let subscription = handle.subscribe();
    assert_eq!(distributor.subscriber_count(), 1);
    drop(subscription);

    assert_eq!(distributor.subscriber_count(), 0);
    assert_eq!(distributor.publish(snapshot(1.0)), 0);
}
