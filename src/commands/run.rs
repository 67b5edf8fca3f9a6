//! Run command handler.
//!
//! Starts the collection engine and prints every published snapshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::config::{SettingsFile, SettingsReader};
use crate::core::system_monitor::{
    EngineConfig, MonitorEngine, NetworkReading, Snapshot, Subscription,
};

/// Execute the run command
pub fn execute(matches: &ArgMatches, settings: SettingsFile) -> Result<()> {
    let interval = matches.get_one::<u64>("interval").copied();
    let once = matches.get_flag("once");
    let json_output = matches.get_flag("json");

    let initial = settings.load().context("Failed to read settings")?;
    let mut config = EngineConfig::from_settings(&initial);
    if let Some(secs) = interval {
        config.interval = Duration::from_secs(secs);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("sysmon-worker")
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run_engine(config, settings, once, json_output))
}

async fn run_engine(
    config: EngineConfig,
    settings: SettingsFile,
    once: bool,
    json_output: bool,
) -> Result<()> {
    let mut engine = MonitorEngine::new(config, Arc::new(settings));

    if once {
        let snapshot = engine.run_cycle().await.context("Collection failed")?;
        return print_snapshot(&snapshot, json_output);
    }

    let handle = engine.spawn();
    let shutdown = handle.shutdown_sender();

    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "Stopping monitor...".yellow().bold());
        let _ = shutdown.send(());
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    if !json_output {
        eprintln!("{}", "Press Ctrl+C to stop".dimmed());
    }

    let printer = tokio::spawn(print_snapshots(handle.state().subscribe(), json_output));
    let outcome = handle.join().await;

    match printer.await {
        Ok(Err(e)) => log::warn!("Snapshot output stopped: {}", e),
        Err(e) => log::warn!("Snapshot output task failed: {}", e),
        Ok(Ok(())) => {}
    }

    outcome.context("Monitor engine stopped unexpectedly")
}

async fn print_snapshots(mut subscription: Subscription, json_output: bool) -> Result<()> {
    while let Some(snapshot) = subscription.next().await {
        // nothing collected yet
        if *snapshot == Snapshot::default() {
            continue;
        }
        print_snapshot(&snapshot, json_output)?;
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", format_summary(snapshot));
    }
    Ok(())
}

fn percent(value: f64, critical: bool) -> String {
    let text = format!("{:.1}%", value);
    if critical {
        text.red().bold().to_string()
    } else {
        text.green().to_string()
    }
}

fn format_network(network: &NetworkReading) -> String {
    if !network.is_connected {
        return format!("{} {}", network.name, "down".red());
    }

    let text = format!(
        "{} {:.0}ms {:.0}% loss {:.1}% bw",
        network.name, network.latency_ms, network.packet_loss_pct, network.bandwidth_usage_pct
    );
    if network.is_critical() {
        text.red().to_string()
    } else {
        text
    }
}

/// One-line summary of a snapshot
pub fn format_summary(snapshot: &Snapshot) -> String {
    let memory = &snapshot.memory;
    let mut parts = vec![
        snapshot
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
            .to_string(),
        format!(
            "cpu {}",
            percent(snapshot.cpu_usage_pct, snapshot.is_cpu_critical())
        ),
        format!(
            "mem {} ({:.1}/{:.1} GB)",
            percent(memory.usage_pct, snapshot.is_memory_critical()),
            memory.used_gb,
            memory.total_gb
        ),
    ];

    if !snapshot.disks.is_empty() {
        let disks: Vec<String> = snapshot
            .disks
            .iter()
            .map(|disk| format!("{} {}", disk.name, percent(disk.usage_pct(), disk.is_critical())))
            .collect();
        parts.push(format!("disks [{}]", disks.join(", ")));
    }

    if !snapshot.networks.is_empty() {
        let networks: Vec<String> = snapshot.networks.iter().map(format_network).collect();
        parts.push(format!("net [{}]", networks.join(", ")));
    }

    parts.join("  ")
}
