//! TIN bus heater controller: entry point.
//!
//! Opens the heater's serial port, publishes decoded fields as `tracing`
//! events and accepts control requests on stdin, one per line:
//!
//! ```text
//! air 21.5 | water 55 | vent 3 | electro 2 | fuel 1
//! power on | gas off | electric on
//! ```
//!
//! # Usage
//!
//! ```text
//! tinbus-heater [OPTIONS]
//!
//! Options:
//!   --config <PATH>               TOML config file [default: tinbus-heater.toml]
//!   --port <PATH>                 Serial port, overrides [serial].port
//!   --update-interval-ms <MS>     Status request period, overrides the config
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tinbus_core::transport::SerialTransport;
use tinbus_core::{FrameDecoder, Link};
use tinbus_heater::infrastructure::{
    load_config, read_requests, run_controller, tracing_sinks, HeaterConfig,
};
use tinbus_heater::{ControllerSettings, HeaterController};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "tinbus-heater", about = "Heater controller for the TIN bus", version)]
struct Cli {
    /// TOML configuration file.  A missing file means all defaults.
    #[arg(long, default_value = "tinbus-heater.toml", env = "TINBUS_HEATER_CONFIG")]
    config: PathBuf,

    /// Serial port the heater is attached to.
    #[arg(long, env = "TINBUS_HEATER_PORT")]
    port: Option<String>,

    /// Status request period in milliseconds.
    #[arg(long)]
    update_interval_ms: Option<u64>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn into_heater_config(self) -> anyhow::Result<HeaterConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))?;
        if let Some(port) = self.port {
            config.serial.port = port;
        }
        if let Some(ms) = self.update_interval_ms {
            config.update_interval_ms = ms;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_heater_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let transport = SerialTransport::open(&config.serial.port, config.serial.baud_rate)
        .with_context(|| format!("opening serial port {}", config.serial.port))?;
    let decoder = FrameDecoder::new(config.bus_profile()?, config.idle_timeout());
    let link = Link::new("heater", transport, decoder);
    let settings = ControllerSettings {
        update_interval: config.update_interval(),
        ..ControllerSettings::default()
    };
    let (controller, control) =
        HeaterController::new(link, tracing_sinks(&config.fields), settings);
    controller.log_config();

    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let accepted = read_requests(stdin, control).await;
        info!("control input closed after {accepted} requests");
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    };
    let controller = run_controller(controller, config.poll_interval(), shutdown)
        .await
        .context("serial port closed")?;

    info!("heater controller stopped: {:?}", controller.stats());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
