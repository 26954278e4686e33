//! tinbus-heater library crate.
//!
//! Talks to the heater over one TIN bus Link: polls its status, publishes
//! the decoded fields to whichever sinks are configured, and turns control
//! requests into command frames.
//!
//! # Architecture
//!
//! ```text
//! control surface ──ControlHandle──▶ ┐
//!                                    HeaterController ──Link──▶ serial port
//! FieldSinks ◀── decoded fields ──── ┘
//! ```
//!
//! - `domain` – sink traits and slots, switch-to-fuel-mode rules (no I/O).
//! - `application` – [`HeaterController`] and [`ControlHandle`].
//! - `infrastructure` – TOML config, `tracing` sinks, tokio drivers.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{ControlError, ControlHandle, ControllerSettings, HeaterController};
pub use domain::{ControlRequest, FieldSinks, SelectSink, SensorSink, SwitchSink};
