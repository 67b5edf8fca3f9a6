//! Network interface classification, operational status and link speed.

use std::path::Path;

pub const SYS_CLASS_NET: &str = "/sys/class/net";

const TUNNEL_PREFIXES: &[&str] = &[
    "tun", "utun", "wg", "gif", "stf", "sit", "gre", "ipip", "ip6tnl", "teredo", "isatap",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Loopback,
    Tunnel,
    Other,
}

impl InterfaceKind {
    /// Loopback and tunnel interfaces are listed but never echo-probed.
    pub fn is_probed(&self) -> bool {
        matches!(self, InterfaceKind::Other)
    }
}

pub fn classify_interface(name: &str) -> InterfaceKind {
    let lower = name.to_ascii_lowercase();

    if lower == "lo" || lower.starts_with("lo0") || lower.contains("loopback") {
        InterfaceKind::Loopback
    } else if TUNNEL_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix) || lower.contains(&format!(" {prefix}")))
    {
        InterfaceKind::Tunnel
    } else {
        InterfaceKind::Other
    }
}

/// Whether the interface is operationally up.
///
/// Only Linux exposes this cheaply; elsewhere every listed interface counts as up.
pub fn is_up(name: &str) -> bool {
    if cfg!(target_os = "linux") {
        operstate_is_up(Path::new(SYS_CLASS_NET), name)
    } else {
        true
    }
}

/// Link speed in Mbit/s when the OS reports one.
pub fn link_speed_mbps(name: &str) -> Option<u64> {
    if cfg!(target_os = "linux") {
        read_link_speed(Path::new(SYS_CLASS_NET), name)
    } else {
        None
    }
}

pub fn operstate_is_up(sys_root: &Path, name: &str) -> bool {
    match std::fs::read_to_string(sys_root.join(name).join("operstate")) {
        // drivers that never report carrier state show "unknown"
        Ok(state) => matches!(state.trim(), "up" | "unknown"),
        Err(e) => {
            log::debug!("No operstate for {}: {}", name, e);
            false
        }
    }
}

pub fn read_link_speed(sys_root: &Path, name: &str) -> Option<u64> {
    let raw = std::fs::read_to_string(sys_root.join(name).join("speed")).ok()?;
    // virtual links report -1
    raw.trim().parse::<i64>().ok().filter(|speed| *speed > 0).map(|speed| speed as u64)
}
