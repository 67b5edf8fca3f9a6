// sysmon library - public API

// Re-export error types
pub mod error;
pub use error::{MonitorError, NotifyError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;

// Re-export commonly used types
pub use core::config::{Settings, SettingsFile, SettingsReader};
pub use core::system_monitor::{EngineConfig, EngineState, MonitorEngine, Snapshot};

/// Initialize logging. `RUST_LOG` takes precedence over the default level.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
