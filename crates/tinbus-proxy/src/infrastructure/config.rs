//! TOML configuration for the proxy.
//!
//! ```toml
//! mode = "passive"
//! profile = "tin"
//! logging_enabled = true
//! log_sink = "tracing"   # or "last_line", "none"
//!
//! [panel]
//! port = "/dev/ttyUSB0"
//!
//! [heater]
//! port = "/dev/ttyUSB1"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tinbus_core::{profile_by_name, BusProfile};

use crate::domain::ProxyMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown bus profile {0:?} (expected \"tin\" or \"lin13\")")]
    UnknownProfile(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    /// Link to the control panel.
    #[serde(default = "default_panel")]
    pub panel: SerialConfig,
    /// Link to the heater unit.
    #[serde(default = "default_heater")]
    pub heater: SerialConfig,
    #[serde(default)]
    pub mode: ProxyMode,
    /// Frame table, parity and checksum rules: `tin` or `lin13`.
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_true")]
    pub logging_enabled: bool,
    #[serde(default)]
    pub log_sink: LogSinkKind,
    /// Silence that ends a partial frame, in milliseconds.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Quiet time on a Link before an injected frame may be written.
    #[serde(default = "default_inject_gap_ms")]
    pub inject_gap_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Where frame summaries go when logging is enabled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSinkKind {
    #[default]
    Tracing,
    /// Keep only the latest summary; the binary reports it on exit.
    #[serde(rename = "last_line")]
    LastLine,
    None,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_panel() -> SerialConfig {
    SerialConfig { port: "/dev/ttyUSB0".to_string(), baud_rate: default_baud_rate() }
}
fn default_heater() -> SerialConfig {
    SerialConfig { port: "/dev/ttyUSB1".to_string(), baud_rate: default_baud_rate() }
}
fn default_baud_rate() -> u32 {
    19_200
}
fn default_profile() -> String {
    "tin".to_string()
}
fn default_true() -> bool {
    true
}
fn default_idle_timeout_ms() -> u64 {
    100
}
fn default_inject_gap_ms() -> u64 {
    20
}
fn default_poll_interval_ms() -> u64 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            panel: default_panel(),
            heater: default_heater(),
            mode: ProxyMode::default(),
            profile: default_profile(),
            logging_enabled: true,
            log_sink: LogSinkKind::default(),
            idle_timeout_ms: default_idle_timeout_ms(),
            inject_gap_ms: default_inject_gap_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
        }
    }
}

impl ProxyConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn inject_gap(&self) -> Duration {
        Duration::from_millis(self.inject_gap_ms)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] for a name no built-in
    /// profile carries.
    pub fn bus_profile(&self) -> Result<&'static BusProfile, ConfigError> {
        profile_by_name(&self.profile).ok_or_else(|| ConfigError::UnknownProfile(self.profile.clone()))
    }

    /// Never zero; `tokio::time::interval` panics on a zero period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Loads the config at `path`, or the defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProxyConfig::default()),
        Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
    }
}
