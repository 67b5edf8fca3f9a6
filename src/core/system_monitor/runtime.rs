//! Collection loop and engine state.
//!
//! One background task drives the loop and is the only writer of the latest
//! snapshot and the last alert time. Everything else observes the engine
//! through an [`EngineState`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::alerts::{AlertConfig, AlertEvaluator};
use super::collector::{CollectorConfig, MetricsCollector};
use super::distribution::{DistributionHandle, Distributor, Subscription, DEFAULT_FANOUT_CAPACITY};
use super::metrics::Snapshot;
use super::notify::{notifier_from_settings, Notifier};
use crate::core::config::{keys, Settings, SettingsReader};
use crate::error::{MonitorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Running,
    Collecting,
    Waiting,
    Stopped,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineStatus::Idle => "idle",
            EngineStatus::Running => "running",
            EngineStatus::Collecting => "collecting",
            EngineStatus::Waiting => "waiting",
            EngineStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay measured from the end of one cycle to the start of the next
    pub interval: Duration,
    pub fanout_capacity: usize,
    pub collector: CollectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            fanout_capacity: DEFAULT_FANOUT_CAPACITY,
            collector: CollectorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: Duration::from_secs(settings.int(keys::ENGINE_INTERVAL_SECONDS) as u64),
            collector: CollectorConfig::from_settings(settings),
            ..Self::default()
        }
    }
}

/// Shared read view of a running engine.
#[derive(Clone)]
pub struct EngineState {
    distribution: DistributionHandle,
    status: watch::Receiver<EngineStatus>,
    last_alert: watch::Receiver<Option<DateTime<Utc>>>,
}

impl EngineState {
    pub fn get_latest(&self) -> Arc<Snapshot> {
        self.distribution.get_latest()
    }

    pub fn subscribe(&self) -> Subscription {
        self.distribution.subscribe()
    }

    pub fn distribution(&self) -> &DistributionHandle {
        &self.distribution
    }

    pub fn status(&self) -> EngineStatus {
        *self.status.borrow()
    }

    pub fn last_alert_time(&self) -> Option<DateTime<Utc>> {
        *self.last_alert.borrow()
    }

    /// Wait until the engine reports `target`. Returns `false` if the engine
    /// went away first.
    pub async fn wait_for(&self, target: EngineStatus) -> bool {
        let mut status = self.status.clone();
        let reached = status.wait_for(|current| *current == target).await.is_ok();
        reached
    }
}

pub struct MonitorEngine {
    collector: MetricsCollector,
    evaluator: AlertEvaluator,
    settings: Arc<dyn SettingsReader>,
    distributor: Distributor,
    interval: Duration,
    status_tx: watch::Sender<EngineStatus>,
    last_alert_tx: watch::Sender<Option<DateTime<Utc>>>,
}

impl MonitorEngine {
    /// Build an engine with the platform's probes and the configured notifier.
    ///
    /// Unreadable settings at startup fall back to defaults (log notifier).
    pub fn new(config: EngineConfig, settings: Arc<dyn SettingsReader>) -> Self {
        let initial = settings.load().unwrap_or_else(|e| {
            log::warn!("Cannot read settings ({}), starting with defaults", e);
            Settings::default()
        });
        let notifier = notifier_from_settings(&initial);
        let collector = MetricsCollector::new(&config.collector);

        Self::with_parts(collector, notifier, settings, &config)
    }

    pub fn with_parts(
        collector: MetricsCollector,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsReader>,
        config: &EngineConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(EngineStatus::Idle);
        let (last_alert_tx, _) = watch::channel(None);

        Self {
            collector,
            evaluator: AlertEvaluator::new(notifier),
            settings,
            distributor: Distributor::new(config.fanout_capacity),
            interval: config.interval,
            status_tx,
            last_alert_tx,
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            distribution: self.distributor.handle(),
            status: self.status_tx.subscribe(),
            last_alert: self.last_alert_tx.subscribe(),
        }
    }

    fn set_status(&self, status: EngineStatus) {
        self.status_tx.send_replace(status);
    }

    /// One cycle: probe, aggregate, evaluate alerts, publish.
    ///
    /// The snapshot is published only after every other step completed, so a
    /// cycle dropped midway leaves the previous snapshot in place.
    pub async fn run_cycle(&mut self) -> Result<Arc<Snapshot>> {
        let now = Utc::now();
        let settings = self.settings.load()?;
        let alert_config = AlertConfig::from_settings(&settings);

        let snapshot = self.collector.collect(now).await;

        self.evaluator.process(&snapshot, &alert_config, now).await;
        self.last_alert_tx
            .send_replace(self.evaluator.last_alert_time());

        let snapshot = Arc::new(snapshot);
        let receivers = self.distributor.publish(Arc::clone(&snapshot));
        log::debug!("[{}] Snapshot published to {} subscribers", now, receivers);

        Ok(snapshot)
    }

    /// Drive the collection loop until `shutdown` fires.
    ///
    /// Errors inside a cycle are logged and the loop continues. A panic
    /// escaping a cycle stops the engine and is returned as `FatalLoop`.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        self.set_status(EngineStatus::Running);
        log::info!(
            "Collection loop started ({} probes, every {}s)",
            self.collector.platform_name(),
            self.interval.as_secs_f64()
        );

        loop {
            self.set_status(EngineStatus::Collecting);

            let outcome = tokio::select! {
                biased;
                _ = shutdown.recv() => None,
                result = AssertUnwindSafe(self.run_cycle()).catch_unwind() => Some(result),
            };

            match outcome {
                None => {
                    log::info!("Shutdown requested during collection, cycle discarded");
                    break;
                }
                Some(Ok(Ok(_))) => {}
                Some(Ok(Err(e))) => {
                    log::warn!("[{}] Collection cycle failed: {}", Utc::now(), e);
                }
                Some(Err(panic)) => {
                    let message = panic_message(panic.as_ref());
                    log::error!("Collection loop aborted: {}", message);
                    self.set_status(EngineStatus::Stopped);
                    return Err(MonitorError::fatal_loop(message));
                }
            }

            self.set_status(EngineStatus::Waiting);
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.set_status(EngineStatus::Stopped);
        log::info!("Collection loop stopped");
        Ok(())
    }

    /// Run the loop on a background task.
    pub fn spawn(self) -> EngineHandle {
        let state = self.state();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));

        EngineHandle {
            state,
            shutdown_tx,
            task,
        }
    }
}

pub(super) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owner of a spawned engine.
pub struct EngineHandle {
    state: EngineState,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl EngineHandle {
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Sender that stops the engine; usable from signal handlers.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Signal shutdown and wait for the loop to finish.
    pub async fn stop(self) -> Result<()> {
        // fails only if the loop already exited
        let _ = self.shutdown_tx.send(());
        self.join().await
    }

    /// Wait for the loop to finish on its own (shutdown sent elsewhere or fatal failure).
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| MonitorError::fatal_loop(format!("engine task failed: {e}")))?
    }
}
