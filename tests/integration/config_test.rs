use std::fs;

use sysmon::core::config::{keys, MemorySettings, SettingsFile, SettingsReader, KNOWN_SETTINGS};
use sysmon::core::system_monitor::{AlertConfig, EngineConfig};
use tempfile::TempDir;

#[test]
fn test_every_known_key_has_a_valid_default() {
    let mut settings = sysmon::Settings::default();
    for spec in KNOWN_SETTINGS.iter().filter(|spec| !spec.default.is_empty()) {
        assert!(
            settings.set(spec.key, spec.default).is_ok(),
            "default of {} does not validate",
            spec.key
        );
    }
}

#[test]
fn test_settings_file_edits_apply_on_next_load() {
    let temp_dir = TempDir::new().unwrap();
    let file = SettingsFile::new(temp_dir.path().join("settings.json"));

    assert_eq!(AlertConfig::from_settings(&file.load().unwrap()), AlertConfig::default());

    fs::write(
        file.path(),
        r#"{"alerts.enabled": true, "alerts.interval_minutes": 5, "alerts.cpu_threshold": 75}"#,
    )
    .unwrap();

    let config = AlertConfig::from_settings(&file.load().unwrap());
    assert!(config.enabled);
    assert_eq!(config.interval_minutes, 5);
    assert_eq!(config.cpu_threshold, 75);
    assert_eq!(config.memory_threshold, 90);
}

#[test]
fn test_out_of_range_file_values_use_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{"alerts.disk_threshold": 250, "engine.interval_seconds": "soon"}"#,
    )
    .unwrap();

    let settings = SettingsFile::new(path).load().unwrap();
    assert_eq!(AlertConfig::from_settings(&settings).disk_threshold, 90);
    assert_eq!(
        EngineConfig::from_settings(&settings).interval.as_secs(),
        5
    );
}

#[test]
fn test_set_rejects_unknown_key_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let file = SettingsFile::new(temp_dir.path().join("settings.json"));

    assert!(file.set("alerts.sound", "on").is_err());
    assert!(!file.path().exists());
}

#[test]
fn test_memory_settings_shared_between_readers() {
    let settings = std::sync::Arc::new(MemorySettings::default());
    let reader: std::sync::Arc<dyn SettingsReader> = settings.clone();

    settings.set(keys::ALERTS_CPU_THRESHOLD, "60").unwrap();
    assert_eq!(reader.load().unwrap().int(keys::ALERTS_CPU_THRESHOLD), 60);
}
