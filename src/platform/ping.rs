//! ICMP echo through the operating system's `ping` utility.
//!
//! Raw ICMP sockets need elevated privileges on most hosts, while the
//! system `ping` binary is setuid or capability-enabled almost everywhere,
//! so one echo request is delegated to it per call.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::error::{MonitorError, Result};

static RTT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)time\s*[=<]\s*([0-9]+(?:[.,][0-9]+)?)\s*ms").expect("valid RTT regex")
});

/// Sends a single echo request and reports its round-trip time.
#[async_trait]
pub trait EchoProber: Send + Sync {
    /// `Ok(None)` means the request went unanswered within `timeout`.
    /// `Err` means the probe itself could not run.
    async fn echo(
        &self,
        target: &str,
        interface: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Duration>>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemPing;

impl SystemPing {
    pub fn new() -> Self {
        Self
    }

    fn command(target: &str, interface: Option<&str>, timeout: Duration) -> Command {
        let mut cmd = Command::new("ping");

        if cfg!(target_os = "windows") {
            cmd.args(["-n", "1", "-w", &timeout.as_millis().to_string()]);
        } else if cfg!(target_os = "macos") {
            cmd.args(["-n", "-c", "1", "-W", &timeout.as_millis().to_string()]);
        } else {
            let secs = timeout.as_secs().max(1);
            cmd.args(["-n", "-c", "1", "-W", &secs.to_string()]);
            if let Some(iface) = interface {
                cmd.args(["-I", iface]);
            }
        }

        cmd.arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl EchoProber for SystemPing {
    async fn echo(
        &self,
        target: &str,
        interface: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Duration>> {
        let mut cmd = Self::command(target, interface, timeout);

        // ping enforces its own deadline; the grace period covers process startup
        let deadline = timeout + Duration::from_millis(500);
        let output = match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                MonitorError::probe("network", format!("failed to run ping: {e}"))
            })?,
            Err(_) => return Ok(None),
        };

        Ok(parse_rtt(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract the round-trip time from `ping` output; `None` when no reply was reported.
pub fn parse_rtt(output: &str) -> Option<Duration> {
    let caps = RTT_PATTERN.captures(output)?;
    let millis: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    Some(Duration::from_micros((millis * 1000.0).round() as u64))
}
