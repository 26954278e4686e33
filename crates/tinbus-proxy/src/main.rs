//! TIN bus proxy: entry point.
//!
//! Relays between the panel and heater ports and logs a summary of every
//! frame it sees.  Requests are read from stdin, one per line:
//!
//! ```text
//! mode active | mode passive
//! heater vent 3 | heater air 21.5 | panel fuel 1
//! ```
//!
//! Commands are only written in active mode.
//!
//! # Usage
//!
//! ```text
//! tinbus-proxy [OPTIONS]
//!
//! Options:
//!   --config <PATH>          TOML config file [default: tinbus-proxy.toml]
//!   --mode <MODE>            passive | active, overrides the config
//!   --no-logging             Do not log frame summaries
//!   --panel-port <PATH>      Panel serial port, overrides [panel].port
//!   --heater-port <PATH>     Heater serial port, overrides [heater].port
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tinbus_core::transport::SerialTransport;
use tinbus_core::{BusProfile, FrameDecoder, Link};
use tinbus_proxy::infrastructure::{
    build_log_sink, load_config, read_proxy_requests, run_proxy, LastLineSink, ProxyConfig,
    SerialConfig,
};
use tinbus_proxy::{BusProxy, ProxyMode, ProxySettings};

/// Requests buffered between the stdin reader and the proxy.
const REQUEST_QUEUE_CAPACITY: usize = 16;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "tinbus-proxy", about = "Transparent TIN bus proxy", version)]
struct Cli {
    /// TOML configuration file.  A missing file means all defaults.
    #[arg(long, default_value = "tinbus-proxy.toml", env = "TINBUS_PROXY_CONFIG")]
    config: PathBuf,

    /// Start in this mode instead of the configured one.
    #[arg(long)]
    mode: Option<ProxyMode>,

    /// Turn frame summaries off.
    #[arg(long)]
    no_logging: bool,

    #[arg(long, env = "TINBUS_PROXY_PANEL_PORT")]
    panel_port: Option<String>,

    #[arg(long, env = "TINBUS_PROXY_HEATER_PORT")]
    heater_port: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn into_proxy_config(self) -> anyhow::Result<ProxyConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))?;
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.no_logging {
            config.logging_enabled = false;
        }
        if let Some(port) = self.panel_port {
            config.panel.port = port;
        }
        if let Some(port) = self.heater_port {
            config.heater.port = port;
        }
        Ok(config)
    }
}

fn open_link(
    name: &'static str,
    serial: &SerialConfig,
    profile: &'static BusProfile,
    config: &ProxyConfig,
) -> anyhow::Result<Link<SerialTransport>> {
    let transport = SerialTransport::open(&serial.port, serial.baud_rate)
        .with_context(|| format!("opening {name} port {}", serial.port))?;
    Ok(Link::new(name, transport, FrameDecoder::new(profile, config.idle_timeout())))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_proxy_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let profile = config.bus_profile()?;
    let panel = open_link("panel", &config.panel, profile, &config)?;
    let heater = open_link("heater", &config.heater, profile, &config)?;
    let settings = ProxySettings { mode: config.mode, inject_gap: config.inject_gap() };
    let mut proxy = BusProxy::new(panel, heater, settings);
    let last_line = LastLineSink::new();
    proxy.set_log_sink(build_log_sink(&config, &last_line));
    proxy.log_config();

    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let forwarded = read_proxy_requests(stdin, tx).await;
        info!("control input closed after {forwarded} requests");
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    };
    let result = run_proxy(proxy, config.poll_interval(), rx, shutdown).await;
    if let Some(line) = last_line.latest() {
        info!("last frame: {line}");
    }
    let proxy = result.context("serial port closed")?;

    info!("proxy stopped: {:?}", proxy.stats());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tinbus_proxy::infrastructure::LogSinkKind;

    fn missing_config() -> String {
        std::env::temp_dir()
            .join("tinbus-proxy-cli-missing.toml")
            .display()
            .to_string()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["tinbus-proxy"]);
        assert_eq!(cli.config, PathBuf::from("tinbus-proxy.toml"));
        assert!(cli.mode.is_none());
        assert!(!cli.no_logging);
    }

    #[test]
    fn test_into_proxy_config_applies_overrides() {
        // Arrange
        let cli = Cli::parse_from([
            "tinbus-proxy",
            "--config",
            &missing_config(),
            "--mode",
            "active",
            "--no-logging",
            "--panel-port",
            "/dev/ttyS0",
            "--heater-port",
            "/dev/ttyS1",
        ]);

        // Act
        let config = cli.into_proxy_config().unwrap();

        // Assert
        assert_eq!(config.mode, ProxyMode::Active);
        assert!(!config.logging_enabled);
        assert_eq!(config.panel.port, "/dev/ttyS0");
        assert_eq!(config.heater.port, "/dev/ttyS1");
        assert!(build_log_sink(&config, &LastLineSink::new()).is_none());
    }

    #[test]
    fn test_into_proxy_config_without_overrides_keeps_defaults() {
        let cli = Cli::parse_from(["tinbus-proxy", "--config", &missing_config()]);
        let config = cli.into_proxy_config().unwrap();
        assert_eq!(config, ProxyConfig::default());
        assert_eq!(config.log_sink, LogSinkKind::Tracing);
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        assert!(Cli::try_parse_from(["tinbus-proxy", "--mode", "loud"]).is_err());
    }
}
