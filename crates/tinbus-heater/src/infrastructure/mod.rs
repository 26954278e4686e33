//! Infrastructure layer for tinbus-heater: configuration file, `tracing`
//! sinks and the tokio drivers around the controller.

pub mod config;
pub mod runner;
pub mod tracing_sinks;

pub use config::{load_config, ConfigError, FieldsConfig, HeaterConfig, SerialConfig};
pub use runner::{read_requests, run_controller};
pub use tracing_sinks::{tracing_sinks, TracingSink};
