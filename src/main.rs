use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

use sysmon::commands;
use sysmon::core::config::SettingsFile;

fn main() -> Result<()> {
    let matches = Command::new("sysmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Host metrics collection and alerting")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Settings file to use (default: $SYSMON_CONFIG or the user config directory)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Collect metrics periodically and print each snapshot")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Delay between collection cycles (overrides engine.interval_seconds)")
                        .value_parser(clap::value_parser!(u64).range(1..=3600)),
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .help("Run a single collection cycle and exit")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print snapshots as JSON lines")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change settings (use 'sysmon config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("List every setting with its effective value"))
                .subcommand(
                    Command::new("set")
                        .about("Validate and store a setting")
                        .arg(Arg::new("key").help("Setting key, e.g. alerts.enabled").required(true).index(1))
                        .arg(Arg::new("value").help("New value").required(true).index(2)),
                )
                .subcommand(
                    Command::new("unset")
                        .about("Reset a setting to its default")
                        .arg(Arg::new("key").help("Setting key").required(true).index(1)),
                ),
        )
        .subcommand(
            Command::new("notify")
                .about("Check the alert notification channel")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("test")
                        .about("Send one notification built from a fresh snapshot, ignoring thresholds"),
                ),
        )
        .get_matches();

    sysmon::init_logging(matches.get_flag("verbose"));

    let settings = match matches.get_one::<PathBuf>("config") {
        Some(path) => SettingsFile::new(path.clone()),
        None => SettingsFile::open_default()?,
    };

    match matches.subcommand() {
        Some(("run", sub_matches)) => {
            commands::run(sub_matches, settings)?;
        }
        Some(("config", sub_matches)) => {
            commands::config(sub_matches, &settings)?;
        }
        Some(("notify", sub_matches)) => {
            commands::notify(sub_matches, &settings)?;
        }
        _ => {
            println!("Welcome to sysmon!");
            println!("Use 'sysmon --help' for more information.");
        }
    }

    Ok(())
}
