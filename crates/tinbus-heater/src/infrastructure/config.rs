//! TOML configuration for the heater controller.
//!
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration:
//!
//! ```toml
//! update_interval_ms = 10000
//! profile = "tin"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 19200
//!
//! [fields]
//! air_temperature = true
//! vent_speed = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tinbus_core::{profile_by_name, BusProfile};

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

    #[error("unknown bus profile {0:?}")]
    UnknownProfile(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeaterConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    /// Period of the status request, in milliseconds.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Silence that ends a partial frame, in milliseconds.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// How often the runtime polls the controller, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `tin` for TIN panels and heaters, `lin13` for strict LIN 1.3 framing.
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub fields: FieldsConfig,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Which sink slots to fill.  Measured values are on by default, echoed
/// command targets are off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldsConfig {
    #[serde(default = "default_true")]
    pub air_temperature: bool,
    #[serde(default = "default_true")]
    pub water_temperature: bool,
    #[serde(default = "default_true")]
    pub status: bool,
    #[serde(default)]
    pub air_target: bool,
    #[serde(default)]
    pub water_target: bool,
    #[serde(default = "default_true")]
    pub power: bool,
    #[serde(default = "default_true")]
    pub fuel_gas: bool,
    #[serde(default = "default_true")]
    pub fuel_electro: bool,
    #[serde(default = "default_true")]
    pub vent_speed: bool,
    #[serde(default = "default_true")]
    pub electro_power: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_update_interval_ms() -> u64 {
    10_000
}
fn default_idle_timeout_ms() -> u64 {
    100
}
fn default_poll_interval_ms() -> u64 {
    5
}
fn default_profile() -> String {
    "tin".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    19_200
}
fn default_true() -> bool {
    true
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            update_interval_ms: default_update_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            profile: default_profile(),
            fields: FieldsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { port: default_port(), baud_rate: default_baud_rate() }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            air_temperature: true,
            water_temperature: true,
            status: true,
            air_target: false,
            water_target: false,
            power: true,
            fuel_gas: true,
            fuel_electro: true,
            vent_speed: true,
            electro_power: true,
        }
    }
}

impl HeaterConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] if `profile` names no
    /// built-in profile.
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
pub fn load_config(path: &Path) -> Result<HeaterConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HeaterConfig::default()),
        Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
    }
}
