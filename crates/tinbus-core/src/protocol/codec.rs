//! Field mapping between frames and typed values.
//!
//! * [`decode_frame`] – pure mapping from a checksummed [`Frame`] to field updates.
//! * [`encode_command`] – validates a [`Command`] and builds exactly one frame.
//! * [`status_request`] – the header that asks the heater for its info frame.
//!
//! Every layout decision (identifier, length, temperature offset) is read from
//! the [`BusProfile`]; the rules here are small pure functions per frame kind.

use tracing::trace;

use super::frame::{Frame, FrameId};
use super::profile::{BusProfile, FrameKind, FrameLayout};
use crate::domain::{
    Command, CommandError, Field, FieldError, FieldUpdate, FieldValue, FuelMode, SelectField,
    StatusCode, Temperature, AIR_TARGET_RANGE, WATER_TARGET_RANGE,
};

/// Result of decoding one frame.
///
/// `rejected` holds fields whose raw value was outside their domain; they were
/// dropped while the remaining fields in `updates` still apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub id: FrameId,
    pub layout: Option<FrameLayout>,
    pub updates: Vec<FieldUpdate>,
    pub rejected: Vec<FieldError>,
}

impl DecodedFrame {
    /// `false` for identifiers the profile does not know.
    pub fn is_recognized(&self) -> bool {
        self.layout.is_some()
    }

    pub fn kind(&self) -> Option<FrameKind> {
        self.layout.map(|s| s.kind)
    }

    /// Profile name of the frame, or `"unrecognized"`.
    pub fn name(&self) -> &'static str {
        self.layout.map_or("unrecognized", |s| s.name)
    }

    fn unrecognized(id: FrameId) -> Self {
        Self { id, layout: None, updates: Vec::new(), rejected: Vec::new() }
    }
}

// ── Decode ────────────────────────────────────────────────────────────────────

/// Maps a frame to the fields it carries.
///
/// Unknown identifiers, and known identifiers whose payload length disagrees
/// with the profile, decode as unrecognized (no updates, no error).
pub fn decode_frame(profile: &BusProfile, frame: &Frame) -> DecodedFrame {
    let Some(layout) = profile.layout(frame.id()).copied() else {
        trace!("frame {} not in profile {}", frame.id(), profile.name);
        return DecodedFrame::unrecognized(frame.id());
    };
    let p = frame.payload();
    if p.len() != layout.payload_len {
        trace!("frame {}: {} bytes, profile says {}", frame.id(), p.len(), layout.payload_len);
        return DecodedFrame::unrecognized(frame.id());
    }

    let mut out = Fields::default();
    match layout.kind {
        FrameKind::AirHeaterCommand => {
            out.temperature(profile, Field::AirTarget, u16::from_le_bytes([p[0], p[1]]));
        }
        FrameKind::WaterHeaterCommand => {
            out.temperature(profile, Field::WaterTarget, u16::from_le_bytes([p[0], p[1]]));
        }
        FrameKind::FuelCommand => out.fuel(p[0]),
        FrameKind::ElectroCommand => out.level(SelectField::ElectroPower, p[0]),
        FrameKind::VentCommand => out.level(SelectField::VentSpeed, p[0]),
        FrameKind::Info => {
            out.temperature(profile, Field::AirTemperature, u16::from_le_bytes([p[0], p[1]]));
            out.temperature(profile, Field::WaterTemperature, u16::from_le_bytes([p[2], p[3]]));
            out.push(Field::Status, FieldValue::Status(StatusCode(p[4])));
            out.fuel(p[5]);
            out.level(SelectField::ElectroPower, p[6]);
            out.level(SelectField::VentSpeed, p[7]);
        }
    }

    DecodedFrame { id: frame.id(), layout: Some(layout), updates: out.updates, rejected: out.rejected }
}

#[derive(Default)]
struct Fields {
    updates: Vec<FieldUpdate>,
    rejected: Vec<FieldError>,
}

impl Fields {
    fn push(&mut self, field: Field, value: FieldValue) {
        self.updates.push(FieldUpdate::new(field, value));
    }

    fn temperature(&mut self, profile: &BusProfile, field: Field, raw: u16) {
        match raw_to_temperature(profile, field, raw) {
            Ok(t) => self.push(field, FieldValue::Temperature(t)),
            Err(e) => self.rejected.push(e),
        }
    }

    fn level(&mut self, select: SelectField, raw: u8) {
        match select.level(raw) {
            Ok(level) => self.push(select.field(), FieldValue::Level(level)),
            Err(e) => self.rejected.push(e),
        }
    }

    fn fuel(&mut self, raw: u8) {
        match FuelMode::from_raw(raw) {
            Ok(mode) => {
                self.push(Field::Power, FieldValue::Switch(mode.is_on()));
                self.push(Field::FuelGas, FieldValue::Switch(mode.gas));
                self.push(Field::FuelElectro, FieldValue::Switch(mode.electro));
            }
            Err(e) => self.rejected.push(e),
        }
    }
}

/// Converts a raw bus temperature using the profile's kelvin offset.
///
/// # Errors
///
/// Returns [`FieldError::TemperatureOutOfRange`] when the result does not fit
/// a [`Temperature`].
pub fn raw_to_temperature(
    profile: &BusProfile,
    field: Field,
    raw: u16,
) -> Result<Temperature, FieldError> {
    i16::try_from(profile.raw_to_deci(raw))
        .map(Temperature::from_deci)
        .map_err(|_| FieldError::TemperatureOutOfRange { field, raw })
}

/// Converts a temperature to its raw bus value, if representable.
pub fn temperature_to_raw(profile: &BusProfile, t: Temperature) -> Option<u16> {
    u16::try_from(profile.deci_to_raw(t.deci())).ok()
}

/// Reads the fuel mode out of a decoded info or fuel frame, if it carried one.
pub fn fuel_mode_of(decoded: &DecodedFrame) -> Option<FuelMode> {
    let switch = |field| {
        decoded.updates.iter().find_map(|u| match (u.field == field, u.value) {
            (true, FieldValue::Switch(on)) => Some(on),
            _ => None,
        })
    };
    Some(FuelMode { gas: switch(Field::FuelGas)?, electro: switch(Field::FuelElectro)? })
}

// ── Encode ────────────────────────────────────────────────────────────────────

/// Validates `command` against its field's domain and builds one frame.
///
/// # Errors
///
/// * [`CommandError::LevelOutOfRange`] – selector index past the option list.
/// * [`CommandError::TemperatureOutOfRange`] – target outside the allowed range.
/// * [`CommandError::NotInProfile`] – the profile carries no frame for it.
///
/// Nothing is produced when an error is returned.
pub fn encode_command(profile: &BusProfile, command: &Command) -> Result<Frame, CommandError> {
    let (kind, payload) = match *command {
        Command::SetAirTarget(t) => {
            let raw = checked_target(profile, Field::AirTarget, t, AIR_TARGET_RANGE)?;
            (FrameKind::AirHeaterCommand, raw.to_le_bytes().to_vec())
        }
        Command::SetWaterTarget(t) => {
            let raw = checked_target(profile, Field::WaterTarget, t, WATER_TARGET_RANGE)?;
            (FrameKind::WaterHeaterCommand, raw.to_le_bytes().to_vec())
        }
        Command::SetFuel(mode) => (FrameKind::FuelCommand, vec![mode.to_raw()]),
        Command::SetLevel { select, index } => {
            let level = select.level(index).map_err(|_| CommandError::LevelOutOfRange {
                field: select.field(),
                index,
                max: select.options().len(),
            })?;
            let kind = match select {
                SelectField::VentSpeed => FrameKind::VentCommand,
                SelectField::ElectroPower => FrameKind::ElectroCommand,
            };
            (kind, vec![level.index()])
        }
    };

    let layout = profile
        .layout_for(kind)
        .ok_or(CommandError::NotInProfile { field: command.target() })?;
    Frame::new(layout.id, payload, profile.format)
        .map_err(|_| CommandError::NotInProfile { field: command.target() })
}

fn checked_target(
    profile: &BusProfile,
    field: Field,
    value: Temperature,
    (min, max): (Temperature, Temperature),
) -> Result<u16, CommandError> {
    let out_of_range = CommandError::TemperatureOutOfRange { field, value, min, max };
    if value < min || value > max {
        return Err(out_of_range);
    }
    temperature_to_raw(profile, value).ok_or(out_of_range)
}

/// Header that polls the heater for its info frame: break, sync, PID.
///
/// Returns `None` if the profile has no info frame.
pub fn status_request(profile: &BusProfile) -> Option<[u8; 3]> {
    profile.layout_for(FrameKind::Info).map(|s| profile.format.header(s.id))
}
