//! Application layer: the poll-driven controller and its control handle.

pub mod control;
pub mod controller;

pub use control::{ControlError, ControlHandle};
pub use controller::{ControllerSettings, ControllerStats, HeaterController};
