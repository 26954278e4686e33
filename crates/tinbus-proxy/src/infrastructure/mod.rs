//! Infrastructure layer for tinbus-proxy: configuration file, log sinks and
//! the tokio drivers around the proxy.

pub mod config;
pub mod log_sinks;
pub mod runner;

pub use config::{load_config, ConfigError, LogSinkKind, ProxyConfig, SerialConfig};
pub use log_sinks::{build_log_sink, LastLineSink, TracingLogSink};
pub use runner::{read_proxy_requests, run_proxy};
