//! Switch requests and how they map onto a fuel command.
//!
//! The heater has no separate "power" or "gas" frames: all three switches are
//! views of the single fuel mode byte.  Turning one switch therefore means
//! sending a whole fuel mode, computed from the last mode the heater reported.

use std::fmt;
use std::str::FromStr;

use tinbus_core::{Command, CommandError, FuelMode, SwitchField};

/// Fuel mode memory used to resolve switch requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuelState {
    /// Mode from the most recent info or fuel frame.
    pub current: Option<FuelMode>,
    /// Most recent mode that had at least one source enabled.
    pub last_active: Option<FuelMode>,
}

impl FuelState {
    pub fn observe(&mut self, mode: FuelMode) {
        self.current = Some(mode);
        if mode.is_on() {
            self.last_active = Some(mode);
        }
    }

    /// The fuel mode that realises `switch = on`.
    ///
    /// Power off clears every source.  Power on keeps the current mode if the
    /// heater is already running, else restores the last active mode, else
    /// falls back to gas.  The gas and electric switches flip their own bit.
    pub fn resolve(&self, switch: SwitchField, on: bool) -> FuelMode {
        let base = self.current.unwrap_or(FuelMode::OFF);
        match (switch, on) {
            (SwitchField::Power, false) => FuelMode::OFF,
            (SwitchField::Power, true) if base.is_on() => base,
            (SwitchField::Power, true) => self.last_active.unwrap_or(FuelMode::GAS),
            (SwitchField::FuelGas, gas) => FuelMode { gas, ..base },
            (SwitchField::FuelElectro, electro) => FuelMode { electro, ..base },
        }
    }
}

/// What the control surface may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// A fully specified command.
    Command(Command),
    /// A switch change, resolved against the reported fuel mode when sent.
    Switch { switch: SwitchField, on: bool },
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRequest::Command(cmd) => write!(f, "{cmd}"),
            ControlRequest::Switch { switch, on } => {
                write!(f, "{} {}", switch_word(*switch), if *on { "on" } else { "off" })
            }
        }
    }
}

fn switch_word(switch: SwitchField) -> &'static str {
    match switch {
        SwitchField::Power => "power",
        SwitchField::FuelGas => "gas",
        SwitchField::FuelElectro => "electric",
    }
}

/// `power|gas|electric on|off`, or anything [`Command`] parses.
impl FromStr for ControlRequest {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let switch = match parts.next() {
            Some("power") => SwitchField::Power,
            Some("gas") => SwitchField::FuelGas,
            Some("electric") => SwitchField::FuelElectro,
            _ => return s.parse().map(ControlRequest::Command),
        };
        let on = match (parts.next(), parts.next()) {
            (Some("on"), None) => true,
            (Some("off"), None) => false,
            _ => return Err(CommandError::Syntax(s.trim().to_string())),
        };
        Ok(ControlRequest::Switch { switch, on })
    }
}
