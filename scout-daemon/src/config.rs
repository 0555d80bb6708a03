//! Load config from file and environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Daemon configuration. File: ~/.config/scout/config.toml or /etc/scout/config.toml.
/// Env overrides: SCOUT_DISCOVERY_PORT, SCOUT_BEACON_INTERVAL_SECS,
/// SCOUT_PEER_TIMEOUT_SECS, SCOUT_REPORT_INTERVAL_SECS, SCOUT_DIAG_CAPACITY,
/// SCOUT_DISPLAY_NAME.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Discovery UDP port (default 45710).
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// Seconds between announce beacons (default 4).
    #[serde(default = "default_beacon_interval_secs")]
    pub beacon_interval_secs: u64,
    /// Seconds without a beacon before a peer drops out of reports (default 16).
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
    /// Seconds between full peer reports to the coordinator (default 2).
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// Diagnostics ring buffer capacity (default 256).
    #[serde(default = "default_diag_capacity")]
    pub diag_capacity: usize,
    /// Name advertised in announce beacons (default "scout").
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_discovery_port() -> u16 {
    45710
}
fn default_beacon_interval_secs() -> u64 {
    4
}
fn default_peer_timeout_secs() -> u64 {
    16
}
fn default_report_interval_secs() -> u64 {
    2
}
fn default_diag_capacity() -> usize {
    scout_core::DEFAULT_DIAG_CAPACITY
}
fn default_display_name() -> String {
    "scout".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            beacon_interval_secs: default_beacon_interval_secs(),
            peer_timeout_secs: default_peer_timeout_secs(),
            report_interval_secs: default_report_interval_secs(),
            diag_capacity: default_diag_capacity(),
            display_name: default_display_name(),
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_default();
    if let Ok(s) = std::env::var("SCOUT_DISCOVERY_PORT") {
        if let Ok(p) = s.parse::<u16>() {
            c.discovery_port = p;
        }
    }
    if let Ok(s) = std::env::var("SCOUT_BEACON_INTERVAL_SECS") {
        if let Ok(v) = s.parse::<u64>() {
            c.beacon_interval_secs = v;
        }
    }
    if let Ok(s) = std::env::var("SCOUT_PEER_TIMEOUT_SECS") {
        if let Ok(v) = s.parse::<u64>() {
            c.peer_timeout_secs = v;
        }
    }
    if let Ok(s) = std::env::var("SCOUT_REPORT_INTERVAL_SECS") {
        if let Ok(v) = s.parse::<u64>() {
            c.report_interval_secs = v;
        }
    }
    if let Ok(s) = std::env::var("SCOUT_DIAG_CAPACITY") {
        if let Ok(v) = s.parse::<usize>() {
            c.diag_capacity = v;
        }
    }
    if let Ok(s) = std::env::var("SCOUT_DISPLAY_NAME") {
        if !s.is_empty() {
            c.display_name = s;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/scout/config.toml"));
    }
    out.push(PathBuf::from("/etc/scout/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Config>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert_eq!(c.discovery_port, 45710);
        assert!(c.peer_timeout_secs > c.beacon_interval_secs);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let c: Config = toml::from_str("discovery_port = 50000").unwrap();
        assert_eq!(c.discovery_port, 50000);
        assert_eq!(c.beacon_interval_secs, 4);
        assert_eq!(c.display_name, "scout");
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(toml::from_str::<Config>("bogus = 1").is_err());
    }
}
