//! Notify command handler.
//!
//! `notify test` sends one notification through the configured channel so a
//! webhook can be checked without waiting for a real breach.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::ArgMatches;
use colored::Colorize;

use crate::core::config::{SettingsFile, SettingsReader};
use crate::core::system_monitor::{
    notifier_from_settings, CollectorConfig, MetricsCollector, Notifier, Snapshot,
};
use crate::error::NotifyError;

pub fn execute(matches: &ArgMatches, file: &SettingsFile) -> Result<()> {
    match matches.subcommand() {
        Some(("test", _)) => handle_test(file),
        _ => {
            println!("Use 'sysmon notify --help' for more information.");
            Ok(())
        }
    }
}

fn handle_test(file: &SettingsFile) -> Result<()> {
    let settings = file.load().context("Failed to read settings")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let notifier = notifier_from_settings(&settings);
        let collector = MetricsCollector::new(&CollectorConfig::from_settings(&settings));

        println!("{}", "Sending test notification...".dimmed());
        let snapshot = send_test(&collector, notifier.as_ref())
            .await
            .context("Test notification failed")?;

        println!(
            "{} Test notification sent (snapshot taken at {})",
            "✓".green(),
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    })
}

/// Collect one snapshot and deliver it through `notifier`, regardless of thresholds.
pub async fn send_test(
    collector: &MetricsCollector,
    notifier: &dyn Notifier,
) -> Result<Snapshot, NotifyError> {
    let snapshot = collector.collect(Utc::now()).await;
    notifier.notify(&snapshot).await?;
    Ok(snapshot)
}
