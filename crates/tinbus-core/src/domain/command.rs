//! Outbound requests to change one controllable field.
//!
//! A [`Command`] always comes from the control surface (or, for the proxy in
//! active mode, from the proxy's own command source).  It is validated against
//! the target field's legal domain by [`crate::protocol::codec::encode_command`]
//! before any byte is produced.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::fields::{Field, FuelMode, SelectField, Temperature};

/// Inclusive range accepted for the air heater target.
pub const AIR_TARGET_RANGE: (Temperature, Temperature) =
    (Temperature::from_deci(50), Temperature::from_deci(350));

/// Inclusive range accepted for the water heater target.
pub const WATER_TARGET_RANGE: (Temperature, Temperature) =
    (Temperature::from_deci(200), Temperature::from_deci(700));

/// A request to change exactly one controllable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the cabin air target temperature.
    SetAirTarget(Temperature),
    /// Set the water target temperature.
    SetWaterTarget(Temperature),
    /// Select which fuel sources are active.
    SetFuel(FuelMode),
    /// Set a selector to a raw index.  The index is checked at encode time.
    SetLevel { select: SelectField, index: u8 },
}

impl Command {
    /// The field this command changes (for fuel commands, the power switch).
    pub fn target(&self) -> Field {
        match self {
            Command::SetAirTarget(_) => Field::AirTarget,
            Command::SetWaterTarget(_) => Field::WaterTarget,
            Command::SetFuel(_) => Field::Power,
            Command::SetLevel { select, .. } => select.field(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetAirTarget(t) => write!(f, "air {:.1}", t.celsius()),
            Command::SetWaterTarget(t) => write!(f, "water {:.1}", t.celsius()),
            Command::SetFuel(m) => write!(f, "fuel {}", m.to_raw()),
            Command::SetLevel { select: SelectField::VentSpeed, index } => write!(f, "vent {index}"),
            Command::SetLevel { select: SelectField::ElectroPower, index } => {
                write!(f, "electro {index}")
            }
        }
    }
}

/// Parses the textual form used by command-line control surfaces:
///
/// ```text
/// air 21.5 | water 55 | vent 3 | electro 2 | fuel <0..3>
/// ```
///
/// Parsing only checks syntax; domain checks happen at encode time.
impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(verb), Some(arg), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CommandError::Syntax(s.trim().to_string()));
        };
        let syntax = || CommandError::Syntax(s.trim().to_string());

        let temperature = |arg: &str| {
            arg.parse::<f32>()
                .ok()
                .and_then(Temperature::from_celsius)
                .ok_or_else(syntax)
        };
        let index = |arg: &str| arg.parse::<u8>().map_err(|_| syntax());

        match verb {
            "air" => Ok(Command::SetAirTarget(temperature(arg)?)),
            "water" => Ok(Command::SetWaterTarget(temperature(arg)?)),
            "vent" => Ok(Command::SetLevel { select: SelectField::VentSpeed, index: index(arg)? }),
            "electro" => Ok(Command::SetLevel {
                select: SelectField::ElectroPower,
                index: index(arg)?,
            }),
            "fuel" => {
                let raw = index(arg)?;
                FuelMode::from_raw(raw)
                    .map(Command::SetFuel)
                    .map_err(|_| CommandError::FuelOutOfRange(raw))
            }
            _ => Err(syntax()),
        }
    }
}

/// Reasons a command is refused.  Nothing is transmitted when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{field}: index {index} outside 0..{max}")]
    LevelOutOfRange { field: Field, index: u8, max: usize },

    #[error("{field}: {value} outside {min}..={max}")]
    TemperatureOutOfRange {
        field: Field,
        value: Temperature,
        min: Temperature,
        max: Temperature,
    },

    #[error("fuel mode {0} outside 0..=3")]
    FuelOutOfRange(u8),

    #[error("cannot parse command: {0:?}")]
    Syntax(String),

    #[error("{field}: the bus profile has no frame for this field")]
    NotInProfile { field: Field },
}
