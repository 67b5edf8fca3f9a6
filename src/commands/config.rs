use crate::core::config::{SettingsFile, SettingsReader, ValueKind, KNOWN_SETTINGS};
use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

pub fn execute(matches: &ArgMatches, file: &SettingsFile) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => handle_show(file),
        Some(("set", sub_matches)) => handle_set(sub_matches, file),
        Some(("unset", sub_matches)) => handle_unset(sub_matches, file),
        _ => {
            println!("Use 'sysmon config --help' for more information.");
            Ok(())
        }
    }
}

/// List every known key with its effective value
fn handle_show(file: &SettingsFile) -> Result<()> {
    let settings = file.load().context("Failed to read settings")?;

    println!(
        "{} {}",
        "Settings file:".white(),
        file.path().display().to_string().cyan()
    );
    println!();

    for spec in KNOWN_SETTINGS {
        let value = match spec.kind {
            ValueKind::Bool => settings.bool(spec.key).to_string(),
            ValueKind::Int { .. } => settings.int(spec.key).to_string(),
            ValueKind::Text => settings
                .text(spec.key)
                .unwrap_or_else(|| "<unset>".to_string()),
        };

        let origin = if settings.is_set(spec.key) {
            String::new()
        } else {
            " (default)".dimmed().to_string()
        };

        println!(
            "  {:<30} {}{}",
            spec.key.bold(),
            value.cyan(),
            origin
        );
        println!("  {:<30} {}", "", spec.description.dimmed());
    }

    Ok(())
}

fn handle_set(matches: &ArgMatches, file: &SettingsFile) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    file.set(key, value)
        .with_context(|| format!("Failed to set {}", key))?;

    let stored = file.load()?;
    println!(
        "{} {}",
        format!("✓ {} set to:", key).green(),
        stored.get(key).unwrap_or(value.as_str())
    );
    Ok(())
}

fn handle_unset(matches: &ArgMatches, file: &SettingsFile) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;

    if file.unset(key)? {
        println!("{}", format!("✓ {} reset to its default", key).green());
    } else {
        println!("{}", format!("{} was not set", key).yellow());
    }
    Ok(())
}
