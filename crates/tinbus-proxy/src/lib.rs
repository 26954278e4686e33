//! tinbus-proxy library crate.
//!
//! Sits between a control panel and a heater on two separate serial Links,
//! relays every byte unchanged, and decodes both directions on the side to
//! produce one-line frame summaries.  In active mode it can also originate
//! its own commands, written into gaps between relayed frames.
//!
//! # Architecture
//!
//! ```text
//! panel port ──▶ Link(panel) ──forward──▶ Link(heater) ──▶ heater port
//!       ▲            │ observe                 │ observe          │
//!       └────────────┼──── forward ◀───────────┼──────────────────┘
//!                    ▼                         ▼
//!                 summaries ──▶ LogSink (optional)
//! ```
//!
//! - `domain` – sides, directions, mode, request parsing, summary format (no I/O).
//! - `application` – [`BusProxy`].
//! - `infrastructure` – TOML config, log sinks, tokio drivers.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{BusProxy, ProxyError, ProxySettings, ProxyStats};
pub use domain::{Direction, InjectRequest, LogSink, ProxyMode, ProxyRequest, ProxyState, Side};
