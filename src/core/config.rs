use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::{MonitorError, Result};

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "SYSMON_CONFIG";

pub mod keys {
    pub const ALERTS_ENABLED: &str = "alerts.enabled";
    pub const ALERTS_INTERVAL_MINUTES: &str = "alerts.interval_minutes";
    pub const ALERTS_CPU_THRESHOLD: &str = "alerts.cpu_threshold";
    pub const ALERTS_MEMORY_THRESHOLD: &str = "alerts.memory_threshold";
    pub const ALERTS_DISK_THRESHOLD: &str = "alerts.disk_threshold";
    pub const ENGINE_INTERVAL_SECONDS: &str = "engine.interval_seconds";
    pub const ENGINE_PING_TARGET: &str = "engine.ping_target";
    pub const ENGINE_PING_COUNT: &str = "engine.ping_count";
    pub const ENGINE_PING_TIMEOUT_MS: &str = "engine.ping_timeout_ms";
    pub const ENGINE_PING_SPACING_MS: &str = "engine.ping_spacing_ms";
    pub const NETWORK_LINK_CAPACITY_MBPS: &str = "network.link_capacity_mbps";
    pub const NOTIFY_WEBHOOK_URL: &str = "notify.webhook_url";
    pub const NOTIFY_WEBHOOK_TIMEOUT_SECS: &str = "notify.webhook_timeout_secs";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int { min: i64, max: i64 },
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct SettingSpec {
    pub key: &'static str,
    pub kind: ValueKind,
    /// Default as text; empty means unset
    pub default: &'static str,
    pub description: &'static str,
}

pub const KNOWN_SETTINGS: &[SettingSpec] = &[
    SettingSpec {
        key: keys::ALERTS_ENABLED,
        kind: ValueKind::Bool,
        default: "false",
        description: "Send notifications when a threshold is reached",
    },
    SettingSpec {
        key: keys::ALERTS_INTERVAL_MINUTES,
        kind: ValueKind::Int { min: 0, max: 10_080 },
        default: "15",
        description: "Minimum minutes between two notifications",
    },
    SettingSpec {
        key: keys::ALERTS_CPU_THRESHOLD,
        kind: ValueKind::Int { min: 0, max: 100 },
        default: "90",
        description: "CPU usage (%) that triggers an alert",
    },
    SettingSpec {
        key: keys::ALERTS_MEMORY_THRESHOLD,
        kind: ValueKind::Int { min: 0, max: 100 },
        default: "90",
        description: "Memory usage (%) that triggers an alert",
    },
    SettingSpec {
        key: keys::ALERTS_DISK_THRESHOLD,
        kind: ValueKind::Int { min: 0, max: 100 },
        default: "90",
        description: "Usage (%) of any disk that triggers an alert",
    },
    SettingSpec {
        key: keys::ENGINE_INTERVAL_SECONDS,
        kind: ValueKind::Int { min: 1, max: 3_600 },
        default: "5",
        description: "Delay between the end of one cycle and the start of the next",
    },
    SettingSpec {
        key: keys::ENGINE_PING_TARGET,
        kind: ValueKind::Text,
        default: "8.8.8.8",
        description: "Address echo-probed to measure latency and loss",
    },
    SettingSpec {
        key: keys::ENGINE_PING_COUNT,
        kind: ValueKind::Int { min: 0, max: 20 },
        default: "4",
        description: "Echo requests per interface per cycle",
    },
    SettingSpec {
        key: keys::ENGINE_PING_TIMEOUT_MS,
        kind: ValueKind::Int { min: 100, max: 10_000 },
        default: "1000",
        description: "Timeout of one echo request",
    },
    SettingSpec {
        key: keys::ENGINE_PING_SPACING_MS,
        kind: ValueKind::Int { min: 0, max: 5_000 },
        default: "100",
        description: "Pause between echo requests",
    },
    SettingSpec {
        key: keys::NETWORK_LINK_CAPACITY_MBPS,
        kind: ValueKind::Int { min: 1, max: 1_000_000 },
        default: "1000",
        description: "Link capacity used when the OS reports no speed",
    },
    SettingSpec {
        key: keys::NOTIFY_WEBHOOK_URL,
        kind: ValueKind::Text,
        default: "",
        description: "Webhook receiving alert notifications (log only when unset)",
    },
    SettingSpec {
        key: keys::NOTIFY_WEBHOOK_TIMEOUT_SECS,
        kind: ValueKind::Int { min: 1, max: 300 },
        default: "10",
        description: "Timeout of one webhook delivery",
    },
];

pub fn setting_spec(key: &str) -> Option<&'static SettingSpec> {
    KNOWN_SETTINGS.iter().find(|spec| spec.key == key)
}

/// Flat dotted key/value view of the settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Typed boolean; unset or invalid values fall back to the key's default.
    pub fn bool(&self, key: &str) -> bool {
        let default = default_of(key).parse().unwrap_or(false);
        match self.get(key) {
            None => default,
            Some(raw) => parse_bool(raw).unwrap_or_else(|| {
                log::warn!("Invalid boolean '{}' for {}, using {}", raw, key, default);
                default
            }),
        }
    }

    /// Typed integer; unset, unparsable or out-of-range values fall back to the key's default.
    pub fn int(&self, key: &str) -> i64 {
        let default = default_of(key).parse().unwrap_or(0);
        let Some(raw) = self.get(key) else {
            return default;
        };

        match (raw.trim().parse::<i64>(), setting_spec(key).map(|spec| spec.kind)) {
            (Ok(value), Some(ValueKind::Int { min, max })) if value < min || value > max => {
                log::warn!(
                    "{} = {} is outside {}..={}, using {}",
                    key,
                    value,
                    min,
                    max,
                    default
                );
                default
            }
            (Ok(value), _) => value,
            (Err(_), _) => {
                log::warn!("Invalid integer '{}' for {}, using {}", raw, key, default);
                default
            }
        }
    }

    /// Text value, or the key's default; `None` when neither is set.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| Some(default_of(key).to_string()).filter(|d| !d.is_empty()))
    }

    /// Validate and store a value for a known key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let spec =
            setting_spec(key).ok_or_else(|| MonitorError::config(format!("unknown key '{key}'")))?;
        let value = value.trim();

        match spec.kind {
            ValueKind::Bool => {
                let parsed = parse_bool(value).ok_or_else(|| {
                    MonitorError::config(format!("{key} expects true or false, got '{value}'"))
                })?;
                self.values.insert(key.to_string(), parsed.to_string());
            }
            ValueKind::Int { min, max } => {
                let parsed: i64 = value.parse().map_err(|_| {
                    MonitorError::config(format!("{key} expects an integer, got '{value}'"))
                })?;
                if parsed < min || parsed > max {
                    return Err(MonitorError::config(format!(
                        "{key} must be between {min} and {max}"
                    )));
                }
                self.values.insert(key.to_string(), parsed.to_string());
            }
            ValueKind::Text => {
                self.values.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn from_json(value: &Value) -> Self {
        let mut values = BTreeMap::new();
        if let Value::Object(map) = value {
            for (key, value) in map {
                let text = match value {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                values.insert(key.clone(), text);
            }
        }
        Self { values }
    }

    /// JSON object with values typed per their key.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(key, raw)| {
                let typed = match setting_spec(key).map(|spec| spec.kind) {
                    Some(ValueKind::Bool) => parse_bool(raw).map(Value::Bool),
                    Some(ValueKind::Int { .. }) => raw.parse::<i64>().ok().map(Value::from),
                    _ => None,
                };
                (key.clone(), typed.unwrap_or_else(|| Value::String(raw.clone())))
            })
            .collect();
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn default_of(key: &str) -> &'static str {
    setting_spec(key).map(|spec| spec.default).unwrap_or("")
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Key/value configuration reader. Each `load` reflects the current settings.
pub trait SettingsReader: Send + Sync {
    fn load(&self) -> Result<Settings>;
}

/// Settings persisted as a JSON object of dotted keys.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The settings file at `$SYSMON_CONFIG` or under the user config directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| MonitorError::config("Could not determine config directory"))?;

        Ok(config_dir.join("sysmon").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(&settings.to_json())?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Validate, store and persist one key.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut settings = self.load()?;
        settings.set(key, value)?;
        self.save(&settings)
    }

    pub fn unset(&self, key: &str) -> Result<bool> {
        let mut settings = self.load()?;
        let removed = settings.remove(key);
        if removed {
            self.save(&settings)?;
        }
        Ok(removed)
    }
}

impl SettingsReader for SettingsFile {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let data = fs::read_to_string(&self.path)?;

        // If the file is empty or corrupted, fall back to defaults
        if data.trim().is_empty() {
            return Ok(Settings::default());
        }

        match serde_json::from_str::<Value>(&data) {
            Ok(value) => Ok(Settings::from_json(&value)),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable settings file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Settings::default())
            }
        }
    }
}

/// In-process settings, for embedding callers and tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: RwLock<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.write().set(key, value)
    }
}

impl SettingsReader for MemorySettings {
    fn load(&self) -> Result<Settings> {
        Ok(self.inner.read().clone())
    }
}
