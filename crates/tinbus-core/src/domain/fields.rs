//! Typed field values carried by TIN bus frames.
//!
//! A *field* is one named value the heater exposes: a temperature, the opaque
//! status byte, one of the fuel switches, or a position in one of the two
//! fixed option lists.  Frames carry zero or more fields; the decoder turns
//! raw payload bytes into [`FieldUpdate`]s and hands them to whichever sink
//! the embedding system registered for that [`Field`].

use std::fmt;

use thiserror::Error;

// ── Option lists ──────────────────────────────────────────────────────────────

/// Display names for the eight fan (vent) speed positions.
pub const VENT_SPEED_OPTIONS: [&str; 8] = [
    "Off", "Speed 1", "Speed 2", "Speed 3", "Speed 4", "Speed 5", "Speed 6", "Speed 7",
];

/// Display names for the four electric heating element positions.
pub const ELECTRO_POWER_OPTIONS: [&str; 4] = ["Off", "1 kW", "2 kW", "3 kW"];

// ── Field identity ────────────────────────────────────────────────────────────

/// Every field the TIN bus can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Measured cabin air temperature.
    AirTemperature,
    /// Measured water (boiler) temperature.
    WaterTemperature,
    /// Opaque heater status code.
    Status,
    /// Heater on/off, derived from the fuel mode (any source active).
    Power,
    /// Gas burner enabled (fuel mode bit 0).
    FuelGas,
    /// Electric element enabled (fuel mode bit 1).
    FuelElectro,
    /// Fan speed position, see [`VENT_SPEED_OPTIONS`].
    VentSpeed,
    /// Electric power position, see [`ELECTRO_POWER_OPTIONS`].
    ElectroPower,
    /// Requested air temperature carried by an air heater command.
    AirTarget,
    /// Requested water temperature carried by a water heater command.
    WaterTarget,
}

impl Field {
    /// Stable snake_case name used in logs and frame summaries.
    pub fn name(self) -> &'static str {
        match self {
            Field::AirTemperature => "air_temperature",
            Field::WaterTemperature => "water_temperature",
            Field::Status => "status",
            Field::Power => "power",
            Field::FuelGas => "fuel_gas",
            Field::FuelElectro => "fuel_electro",
            Field::VentSpeed => "vent_speed",
            Field::ElectroPower => "electro_power",
            Field::AirTarget => "air_target",
            Field::WaterTarget => "water_target",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two multi-level selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectField {
    VentSpeed,
    ElectroPower,
}

impl SelectField {
    /// The fixed, named option list for this selector.
    pub fn options(self) -> &'static [&'static str] {
        match self {
            SelectField::VentSpeed => &VENT_SPEED_OPTIONS,
            SelectField::ElectroPower => &ELECTRO_POWER_OPTIONS,
        }
    }

    /// The generic [`Field`] this selector publishes as.
    pub fn field(self) -> Field {
        match self {
            SelectField::VentSpeed => Field::VentSpeed,
            SelectField::ElectroPower => Field::ElectroPower,
        }
    }

    /// Validates a raw index against this selector's option list.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::LevelOutOfRange`] if `raw` is not a valid index.
    pub fn level(self, raw: u8) -> Result<Level, FieldError> {
        let max = self.options().len();
        if usize::from(raw) < max {
            Ok(Level { select: self, index: raw })
        } else {
            Err(FieldError::LevelOutOfRange {
                field: self.field(),
                index: raw,
                max,
            })
        }
    }
}

/// The three user-facing switches.  All of them are views of the fuel mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchField {
    Power,
    FuelGas,
    FuelElectro,
}

impl SwitchField {
    pub fn field(self) -> Field {
        match self {
            SwitchField::Power => Field::Power,
            SwitchField::FuelGas => Field::FuelGas,
            SwitchField::FuelElectro => Field::FuelElectro,
        }
    }
}

// ── Value types ───────────────────────────────────────────────────────────────

/// A temperature in tenths of a degree Celsius.
///
/// Stored as an integer so that one-decimal values survive an encode/decode
/// round trip exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temperature(i16);

impl Temperature {
    /// Builds a temperature from tenths of a degree (`215` = 21.5 °C).
    pub const fn from_deci(deci: i16) -> Self {
        Self(deci)
    }

    /// Builds a temperature from degrees, rounded to one decimal.
    ///
    /// Returns `None` for non-finite input or values outside ±3276.7 °C.
    pub fn from_celsius(celsius: f32) -> Option<Self> {
        if !celsius.is_finite() {
            return None;
        }
        let deci = (celsius * 10.0).round();
        if deci < f32::from(i16::MIN) || deci > f32::from(i16::MAX) {
            return None;
        }
        Some(Self(deci as i16))
    }

    /// Tenths of a degree.
    pub const fn deci(self) -> i16 {
        self.0
    }

    /// Degrees Celsius.
    pub fn celsius(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}°C", abs / 10, abs % 10)
    }
}

/// Opaque status enumerant reported by the heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u8);

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// A validated position in one of the fixed option lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Level {
    select: SelectField,
    index: u8,
}

impl Level {
    pub fn select(self) -> SelectField {
        self.select
    }

    pub fn index(self) -> u8 {
        self.index
    }

    /// Display name of this position.
    pub fn option(self) -> &'static str {
        // Index was validated against the same table on construction.
        self.select.options()[usize::from(self.index)]
    }
}

/// Fuel source selection: gas burner, electric element, both, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FuelMode {
    pub gas: bool,
    pub electro: bool,
}

impl FuelMode {
    pub const OFF: FuelMode = FuelMode { gas: false, electro: false };
    pub const GAS: FuelMode = FuelMode { gas: true, electro: false };

    /// Parses the raw fuel byte.  Only bits 0 and 1 are defined.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidFuelMode`] if any other bit is set.
    pub fn from_raw(raw: u8) -> Result<Self, FieldError> {
        if raw & !0x03 != 0 {
            return Err(FieldError::InvalidFuelMode(raw));
        }
        Ok(Self {
            gas: raw & 0x01 != 0,
            electro: raw & 0x02 != 0,
        })
    }

    pub fn to_raw(self) -> u8 {
        u8::from(self.gas) | (u8::from(self.electro) << 1)
    }

    /// The heater counts as powered when any fuel source is active.
    pub fn is_on(self) -> bool {
        self.gas || self.electro
    }
}

/// The decoded meaning of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Temperature(Temperature),
    Status(StatusCode),
    Switch(bool),
    Level(Level),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Temperature(t) => write!(f, "{t}"),
            FieldValue::Status(s) => write!(f, "{s}"),
            FieldValue::Switch(on) => f.write_str(if *on { "on" } else { "off" }),
            FieldValue::Level(l) => write!(f, "{} ({})", l.index(), l.option()),
        }
    }
}

/// One typed update produced by decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldUpdate {
    pub field: Field,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn new(field: Field, value: FieldValue) -> Self {
        Self { field, value }
    }
}

impl fmt::Display for FieldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// A single field that could not be decoded.  Sibling fields are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{field}: index {index} outside 0..{max}")]
    LevelOutOfRange { field: Field, index: u8, max: usize },

    #[error("invalid fuel mode byte 0x{0:02X}")]
    InvalidFuelMode(u8),

    #[error("{field}: raw value 0x{raw:04X} is not a representable temperature")]
    TemperatureOutOfRange { field: Field, raw: u16 },
}
