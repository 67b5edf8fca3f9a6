use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sysmon::core::config::{keys, MemorySettings, Settings, SettingsReader};
use sysmon::core::system_monitor::probes::{
    CounterSource, DiskProbe, DiskSample, InterfaceCounters, InterfaceMonitor, MemorySample,
    PingSettings, PlatformProbe,
};
use sysmon::core::system_monitor::{
    EngineConfig, EngineStatus, LogNotifier, MetricsCollector, MonitorEngine, Notifier, Snapshot,
};
use sysmon::platform::EchoProber;
use sysmon::{MonitorError, NotifyError, Result};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Clone, Copy)]
enum CpuBehavior {
    Value(f64),
    Fail,
    Hang,
    Panic,
}

struct FakePlatform {
    cpu: CpuBehavior,
    memory_panics: bool,
}

#[async_trait]
impl PlatformProbe for FakePlatform {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn sample_cpu(&self) -> Result<f64> {
        match self.cpu {
            CpuBehavior::Value(value) => Ok(value),
            CpuBehavior::Fail => Err(MonitorError::probe("cpu", "counter unavailable")),
            CpuBehavior::Hang => std::future::pending().await,
            CpuBehavior::Panic => panic!("cpu counter handle corrupted"),
        }
    }

    async fn sample_memory(&self) -> Result<MemorySample> {
        if self.memory_panics {
            panic!("meminfo parser hit an unexpected layout");
        }
        Ok(MemorySample {
            total_bytes: 16 * GIB,
            free_bytes: 4 * GIB,
        })
    }
}

struct FakeDisks;

#[async_trait]
impl DiskProbe for FakeDisks {
    async fn sample_disks(&self) -> Result<Vec<DiskSample>> {
        Ok(vec![DiskSample {
            name: "/".to_string(),
            total_bytes: 500 * GIB,
            available_bytes: 125 * GIB,
        }])
    }
}

struct FixedCounters;

impl CounterSource for FixedCounters {
    fn read(&mut self) -> Result<Vec<InterfaceCounters>> {
        Ok(["eth0", "lo", "wlan0"]
            .iter()
            .map(|name| InterfaceCounters {
                name: name.to_string(),
                bytes_sent: 1_000,
                bytes_received: 2_000,
                is_up: true,
                link_speed_mbps: Some(100),
            })
            .collect())
    }
}

/// Answers on eth0 and cannot run on wlan0.
struct FlakyEcho;

#[async_trait]
impl EchoProber for FlakyEcho {
    async fn echo(
        &self,
        _target: &str,
        interface: Option<&str>,
        _timeout: Duration,
    ) -> Result<Option<Duration>> {
        match interface {
            Some("wlan0") => Err(MonitorError::probe("network", "ping: SO_BINDTODEVICE failed")),
            _ => Ok(Some(Duration::from_millis(12))),
        }
    }
}

#[derive(Default)]
struct CountingNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _snapshot: &Snapshot) -> std::result::Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenSettings;

impl SettingsReader for BrokenSettings {
    fn load(&self) -> Result<Settings> {
        Err(MonitorError::config("permission denied"))
    }
}

/// Fails every other load.
#[derive(Default)]
struct FlakySettings {
    loads: AtomicUsize,
}

impl SettingsReader for FlakySettings {
    fn load(&self) -> Result<Settings> {
        if self.loads.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            Err(MonitorError::config("settings store unavailable"))
        } else {
            Ok(Settings::default())
        }
    }
}

fn collector(cpu: CpuBehavior) -> MetricsCollector {
    collector_with(FakePlatform {
        cpu,
        memory_panics: false,
    })
}

fn collector_with(platform: FakePlatform) -> MetricsCollector {
    let ping = PingSettings {
        count: 2,
        spacing: Duration::ZERO,
        ..Default::default()
    };

    MetricsCollector::with_probes(
        Box::new(platform),
        Box::new(FakeDisks),
        Box::new(InterfaceMonitor::with_parts(
            Box::new(FixedCounters),
            Arc::new(FlakyEcho),
            ping,
            1_000,
        )),
    )
}

fn engine_with(
    cpu: CpuBehavior,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsReader>,
) -> MonitorEngine {
    let config = EngineConfig {
        interval: Duration::from_millis(20),
        ..Default::default()
    };
    MonitorEngine::with_parts(collector(cpu), notifier, settings, &config)
}

fn engine(cpu: CpuBehavior) -> MonitorEngine {
    engine_with(
        cpu,
        Arc::new(LogNotifier),
        Arc::new(MemorySettings::default()),
    )
}

#[tokio::test]
async fn test_failing_interface_does_not_abort_cycle() {
    let mut engine = engine(CpuBehavior::Value(37.5));
    let snapshot = engine.run_cycle().await.unwrap();

    assert_eq!(snapshot.cpu_usage_pct, 37.5);
    assert_eq!(snapshot.memory.usage_pct, 75.0);
    assert_eq!(snapshot.disks.len(), 1);
    assert_eq!(snapshot.disks[0].usage_pct(), 75.0);

    let by_name = |name: &str| snapshot.networks.iter().find(|n| n.name == name).unwrap();
    let eth0 = by_name("eth0");
    assert!(eth0.is_connected);
    assert_eq!(eth0.packet_loss_pct, 0.0);
    assert_eq!(eth0.latency_ms, 12.0);

    assert!(!by_name("wlan0").is_connected);
    assert!(by_name("lo").is_connected);
}

#[tokio::test]
async fn test_failing_cpu_probe_degrades_to_zero() {
    let mut engine = engine(CpuBehavior::Fail);
    let snapshot = engine.run_cycle().await.unwrap();

    assert_eq!(snapshot.cpu_usage_pct, 0.0);
    assert_eq!(snapshot.memory.usage_pct, 75.0);
    assert_eq!(snapshot.disks.len(), 1);
}

#[tokio::test]
async fn test_cancellation_publishes_no_partial_snapshot() {
    let handle = engine(CpuBehavior::Hang).spawn();
    let state = handle.state().clone();

    assert!(state.wait_for(EngineStatus::Collecting).await);

    tokio::time::timeout(Duration::from_secs(2), handle.stop())
        .await
        .expect("engine did not stop promptly")
        .unwrap();

    assert_eq!(state.status(), EngineStatus::Stopped);
    assert_eq!(*state.get_latest(), Snapshot::default());
}

#[tokio::test]
async fn test_panicking_cpu_reading_keeps_loop_running() {
    let handle = engine(CpuBehavior::Panic).spawn();
    let mut subscription = handle.state().subscribe();

    subscription.next().await.unwrap();
    for _ in 0..2 {
        let snapshot = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("no snapshot published")
            .unwrap();
        assert_eq!(snapshot.cpu_usage_pct, 0.0);
        assert_eq!(snapshot.memory.usage_pct, 75.0);
    }

    assert_ne!(handle.state().status(), EngineStatus::Stopped);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_panicking_memory_reading_keeps_others_valid() {
    let config = EngineConfig {
        interval: Duration::from_millis(20),
        ..Default::default()
    };
    let mut engine = MonitorEngine::with_parts(
        collector_with(FakePlatform {
            cpu: CpuBehavior::Value(37.5),
            memory_panics: true,
        }),
        Arc::new(LogNotifier),
        Arc::new(MemorySettings::default()),
        &config,
    );
    let state = engine.state();

    let snapshot = engine.run_cycle().await.unwrap();
    assert_eq!(snapshot.cpu_usage_pct, 37.5);
    assert_eq!(snapshot.memory.total_gb, 0.0);
    assert_eq!(snapshot.memory.usage_pct, 0.0);
    assert_eq!(snapshot.disks.len(), 1);
    assert_eq!(snapshot.disks[0].usage_pct(), 75.0);
    assert!(Arc::ptr_eq(&snapshot, &state.get_latest()));
}

#[tokio::test]
async fn test_unreadable_settings_start_with_defaults() {
    let engine = MonitorEngine::new(EngineConfig::default(), Arc::new(BrokenSettings));
    let state = engine.state();

    assert_eq!(state.status(), EngineStatus::Idle);
    assert_eq!(state.last_alert_time(), None);
    assert_eq!(*state.get_latest(), Snapshot::default());
}

#[tokio::test]
async fn test_failed_cycles_do_not_stop_the_loop() {
    let settings = Arc::new(FlakySettings::default());
    let handle = engine_with(
        CpuBehavior::Value(10.0),
        Arc::new(LogNotifier),
        settings.clone(),
    )
    .spawn();
    let mut subscription = handle.state().subscribe();

    // initial zeroed snapshot, then two published cycles with a failed one between
    subscription.next().await.unwrap();
    for _ in 0..2 {
        let snapshot = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("no snapshot published")
            .unwrap();
        assert_eq!(snapshot.cpu_usage_pct, 10.0);
    }

    assert!(settings.loads.load(Ordering::SeqCst) >= 3);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_engine_alerts_once_per_cooldown() {
    let settings = MemorySettings::default();
    settings.set(keys::ALERTS_ENABLED, "true").unwrap();
    settings.set(keys::ALERTS_CPU_THRESHOLD, "30").unwrap();

    let notifier = Arc::new(CountingNotifier::default());
    let mut engine = engine_with(
        CpuBehavior::Value(37.5),
        notifier.clone(),
        Arc::new(settings),
    );
    let state = engine.state();

    engine.run_cycle().await.unwrap();
    engine.run_cycle().await.unwrap();

    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    assert!(state.last_alert_time().is_some());
}
