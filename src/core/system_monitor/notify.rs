//! Outbound alert notifications.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::metrics::{NetworkReading, Snapshot};
use crate::core::config::{keys, Settings};
use crate::error::NotifyError;

const REPORT_CRITICAL_PERCENT: f64 = 90.0;
const REPORT_WARNING_PERCENT: f64 = 70.0;
const REPORT_WARNING_LOSS_PERCENT: f64 = 10.0;
const REPORT_WARNING_LATENCY_MS: f64 = 500.0;

pub const ALERT_SUBJECT: &str = "System resource alert";

/// Delivers a fired alert. May be slow; callers treat failures as non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, snapshot: &Snapshot) -> Result<(), NotifyError>;
}

/// Writes the alert report to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, snapshot: &Snapshot) -> Result<(), NotifyError> {
        log::warn!("{}\n{}", ALERT_SUBJECT, render_alert_report(snapshot));
        Ok(())
    }
}

/// Posts `{subject, body, snapshot}` as JSON to a webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sysmon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, snapshot: &Snapshot) -> Result<(), NotifyError> {
        let payload = json!({
            "subject": ALERT_SUBJECT,
            "body": render_alert_report(snapshot),
            "snapshot": snapshot,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        log::debug!("Alert delivered to {} ({})", self.url, status);
        Ok(())
    }
}

/// Webhook notifier when `notify.webhook_url` is set, log notifier otherwise.
pub fn notifier_from_settings(settings: &Settings) -> Arc<dyn Notifier> {
    let Some(url) = settings.text(keys::NOTIFY_WEBHOOK_URL) else {
        return Arc::new(LogNotifier);
    };
    let timeout = Duration::from_secs(settings.int(keys::NOTIFY_WEBHOOK_TIMEOUT_SECS) as u64);

    match WebhookNotifier::new(url, timeout) {
        Ok(webhook) => {
            log::info!("Alerts will be posted to {}", webhook.url());
            Arc::new(webhook)
        }
        Err(e) => {
            log::warn!("Webhook notifier unavailable ({}), logging alerts instead", e);
            Arc::new(LogNotifier)
        }
    }
}

fn usage_status(value: f64) -> &'static str {
    if value > REPORT_CRITICAL_PERCENT {
        "CRITICAL"
    } else if value > REPORT_WARNING_PERCENT {
        "WARNING"
    } else {
        "OK"
    }
}

fn network_status(network: &NetworkReading) -> &'static str {
    if !network.is_connected {
        "DOWN"
    } else if network.packet_loss_pct > REPORT_WARNING_LOSS_PERCENT
        || network.latency_ms > REPORT_WARNING_LATENCY_MS
    {
        "WARNING"
    } else {
        "OK"
    }
}

/// Plain-text report of a snapshot with one status word per row.
pub fn render_alert_report(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let memory = &snapshot.memory;

    let _ = writeln!(out, "Snapshot taken at {}", snapshot.timestamp.to_rfc3339());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "CPU      {:>6.1}%  {}",
        snapshot.cpu_usage_pct,
        usage_status(snapshot.cpu_usage_pct)
    );
    let _ = writeln!(
        out,
        "Memory   {:>6.1}%  {}  ({:.1} of {:.1} GB used)",
        memory.usage_pct,
        usage_status(memory.usage_pct),
        memory.used_gb,
        memory.total_gb
    );

    if !snapshot.disks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Disks");
        for disk in &snapshot.disks {
            let usage = disk.usage_pct();
            let _ = writeln!(
                out,
                "  {:<20} {:>6.1}%  {}  ({:.1} GB free)",
                disk.name,
                usage,
                usage_status(usage),
                disk.free_gb
            );
        }
    }

    if !snapshot.networks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Network");
        for network in &snapshot.networks {
            let _ = writeln!(
                out,
                "  {:<20} {}  loss {:.0}%  latency {:.0} ms",
                network.name,
                network_status(network),
                network.packet_loss_pct,
                network.latency_ms
            );
        }
    }

    out
}
