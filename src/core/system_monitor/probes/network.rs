//! Network interface probe: byte counters, rates and active link quality.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use sysinfo::Networks;

use super::NetworkSample;
use crate::error::{MonitorError, Result};
use crate::platform::netif;
use crate::platform::{classify_interface, EchoProber, SystemPing};

/// Cumulative counters for one interface at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub is_up: bool,
    pub link_speed_mbps: Option<u64>,
}

/// Source of interface byte counters. Called from a blocking thread.
pub trait CounterSource: Send {
    fn read(&mut self) -> Result<Vec<InterfaceCounters>>;
}

pub struct SysinfoCounters {
    networks: Networks,
}

impl SysinfoCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysinfoCounters {
    fn read(&mut self) -> Result<Vec<InterfaceCounters>> {
        self.networks.refresh(true);

        let mut interfaces: Vec<InterfaceCounters> = self
            .networks
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name: name.to_string(),
                bytes_sent: data.total_transmitted(),
                bytes_received: data.total_received(),
                is_up: netif::is_up(name),
                link_speed_mbps: netif::link_speed_mbps(name),
            })
            .collect();

        // the underlying map has no stable order
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }
}

/// Echo probing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingSettings {
    pub target: String,
    pub count: u32,
    pub timeout: Duration,
    pub spacing: Duration,
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            target: "8.8.8.8".to_string(),
            count: 4,
            timeout: Duration::from_secs(1),
            spacing: Duration::from_millis(100),
        }
    }
}

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Readings for every operationally-up interface. Per-interface failures
    /// are contained: the interface is reported as disconnected.
    async fn sample_networks(&self) -> Vec<NetworkSample>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LinkQuality {
    packet_loss_pct: f64,
    latency_ms: f64,
}

#[derive(Debug, Clone, Copy)]
struct CounterMark {
    sent: u64,
    received: u64,
    at: Instant,
}

pub struct InterfaceMonitor {
    source: Arc<Mutex<Box<dyn CounterSource>>>,
    echo: Arc<dyn EchoProber>,
    ping: PingSettings,
    default_capacity_mbps: u64,
    previous: Mutex<HashMap<String, CounterMark>>,
}

impl InterfaceMonitor {
    pub fn new(ping: PingSettings, default_capacity_mbps: u64) -> Self {
        Self::with_parts(
            Box::new(SysinfoCounters::new()),
            Arc::new(SystemPing::new()),
            ping,
            default_capacity_mbps,
        )
    }

    pub fn with_parts(
        source: Box<dyn CounterSource>,
        echo: Arc<dyn EchoProber>,
        ping: PingSettings,
        default_capacity_mbps: u64,
    ) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            echo,
            ping,
            default_capacity_mbps,
            previous: Mutex::new(HashMap::new()),
        }
    }

    async fn read_counters(&self) -> Result<Vec<InterfaceCounters>> {
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || source.lock().read())
            .await
            .map_err(|e| MonitorError::probe("network", format!("counter task failed: {e}")))?
    }

    /// Send/receive rates since the previous observation of each interface.
    /// Interfaces seen for the first time report zero.
    fn update_rates(&self, interfaces: &[InterfaceCounters], now: Instant) -> Vec<(f64, f64)> {
        let mut previous = self.previous.lock();

        let rates = interfaces
            .iter()
            .map(|iface| {
                let rates = match previous.get(&iface.name) {
                    Some(mark) => {
                        let elapsed = now.saturating_duration_since(mark.at).as_secs_f64();
                        (
                            byte_rate(mark.sent, iface.bytes_sent, elapsed),
                            byte_rate(mark.received, iface.bytes_received, elapsed),
                        )
                    }
                    None => (0.0, 0.0),
                };
                previous.insert(
                    iface.name.clone(),
                    CounterMark {
                        sent: iface.bytes_sent,
                        received: iface.bytes_received,
                        at: now,
                    },
                );
                rates
            })
            .collect();

        previous.retain(|name, _| interfaces.iter().any(|iface| &iface.name == name));
        rates
    }

    async fn measure_link(&self, interface: &str) -> Result<LinkQuality> {
        let count = self.ping.count;
        if count == 0 {
            return Ok(LinkQuality::default());
        }

        let mut answered = 0u32;
        let mut failed = 0u32;
        let mut total_rtt = Duration::ZERO;
        let mut last_error = None;

        for attempt in 0..count {
            match self
                .echo
                .echo(&self.ping.target, Some(interface), self.ping.timeout)
                .await
            {
                Ok(Some(rtt)) => {
                    answered += 1;
                    total_rtt += rtt;
                }
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    last_error = Some(e);
                }
            }

            if attempt + 1 < count {
                tokio::time::sleep(self.ping.spacing).await;
            }
        }

        if failed == count {
            return Err(last_error.unwrap_or_else(|| {
                MonitorError::probe("network", format!("no echo probe ran on {interface}"))
            }));
        }

        Ok(LinkQuality {
            packet_loss_pct: f64::from(count - answered) * 100.0 / f64::from(count),
            latency_ms: if answered > 0 {
                total_rtt.as_micros() as f64 / 1000.0 / f64::from(answered)
            } else {
                0.0
            },
        })
    }

    async fn link_status(&self, iface: &InterfaceCounters) -> (bool, LinkQuality) {
        if !classify_interface(&iface.name).is_probed() {
            return (true, LinkQuality::default());
        }

        match self.measure_link(&iface.name).await {
            Ok(quality) => (true, quality),
            Err(e) => {
                log::warn!("Link measurement failed for {}: {}", iface.name, e);
                (false, LinkQuality::default())
            }
        }
    }
}

#[async_trait]
impl NetworkProbe for InterfaceMonitor {
    async fn sample_networks(&self) -> Vec<NetworkSample> {
        let interfaces = match self.read_counters().await {
            Ok(interfaces) => interfaces,
            Err(e) => {
                log::warn!("Network counters unavailable: {}", e);
                return Vec::new();
            }
        };

        let up: Vec<InterfaceCounters> = interfaces.into_iter().filter(|i| i.is_up).collect();
        let rates = self.update_rates(&up, Instant::now());

        // one slow interface must not serialize the others
        let statuses = join_all(up.iter().map(|iface| self.link_status(iface))).await;

        up.into_iter()
            .zip(rates)
            .zip(statuses)
            .map(|((iface, (send_rate, recv_rate)), (is_connected, quality))| {
                let capacity = iface.link_speed_mbps.unwrap_or(self.default_capacity_mbps);
                NetworkSample {
                    bandwidth_usage_pct: bandwidth_usage_pct(send_rate, recv_rate, capacity),
                    name: iface.name,
                    bytes_sent: iface.bytes_sent,
                    bytes_received: iface.bytes_received,
                    send_rate,
                    recv_rate,
                    packet_loss_pct: quality.packet_loss_pct,
                    latency_ms: quality.latency_ms,
                    is_connected,
                }
            })
            .collect()
    }
}

/// Bytes per second between two cumulative readings. Counter resets yield 0.
pub fn byte_rate(previous: u64, current: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    current.saturating_sub(previous) as f64 / elapsed_secs
}

/// Busiest direction as a share of link capacity, in percent (unclamped).
pub fn bandwidth_usage_pct(send_rate: f64, recv_rate: f64, capacity_mbps: u64) -> f64 {
    if capacity_mbps == 0 {
        return 0.0;
    }
    let capacity_bits = capacity_mbps as f64 * 1_000_000.0;
    send_rate.max(recv_rate) * 8.0 / capacity_bits * 100.0
}
