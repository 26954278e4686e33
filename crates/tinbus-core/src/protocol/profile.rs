//! Pluggable description of a bus: which identifiers exist, how long their
//! payloads are, which parity and checksum rules apply and how temperatures
//! are scaled.
//!
//! The decoder and codec never hard-code frame layouts; they look them up in a
//! [`BusProfile`].  [`TIN_PROFILE`] is the layout observed on the heater's
//! TIN bus.  [`LIN13_PROFILE`] carries the same frames with strict LIN 1.3
//! parity and checksum.  A different firmware variant is supported by
//! supplying another static profile.

use super::frame::{FrameFormat, FrameId};

/// What a frame means, independent of its numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Target air temperature, raw u16 little-endian.
    AirHeaterCommand,
    /// Target water temperature, raw u16 little-endian.
    WaterHeaterCommand,
    /// Fuel mode byte (bit 0 gas, bit 1 electric).
    FuelCommand,
    /// Electric power level byte.
    ElectroCommand,
    /// Fan level byte.
    VentCommand,
    /// Periodic status: both temperatures, status, fuel mode and both levels.
    Info,
}

/// One row of a profile's frame table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub id: FrameId,
    pub kind: FrameKind,
    pub name: &'static str,
    pub payload_len: usize,
}

/// A complete bus description.
#[derive(Debug)]
pub struct BusProfile {
    pub name: &'static str,
    pub format: FrameFormat,
    pub frames: &'static [FrameLayout],
    /// Zero °C in hundredths of a kelvin.  Raw temperatures are tenths of a
    /// kelvin, truncated on the way out.
    pub kelvin_offset: i32,
}

impl BusProfile {
    /// Looks up the table row for `id`.
    pub fn layout(&self, id: FrameId) -> Option<&FrameLayout> {
        self.frames.iter().find(|s| s.id == id)
    }

    /// Looks up the table row for a frame kind.
    pub fn layout_for(&self, kind: FrameKind) -> Option<&FrameLayout> {
        self.frames.iter().find(|s| s.kind == kind)
    }

    /// Payload length for `id`.  Identifiers missing from the table fall back
    /// to the LIN 1.x length-from-identifier rule so they can still be
    /// delimited and checksummed.
    pub fn payload_len(&self, id: FrameId) -> usize {
        self.layout(id)
            .map(|s| s.payload_len)
            .unwrap_or_else(|| lin_default_length(id))
    }

    /// Raw tenths of a kelvin to tenths of a °C, rounding half up.
    pub fn raw_to_deci(&self, raw: u16) -> i32 {
        (i32::from(raw) * 10 - self.kelvin_offset + 5).div_euclid(10)
    }

    /// Tenths of a °C to raw tenths of a kelvin, truncating.
    pub fn deci_to_raw(&self, deci: i16) -> i32 {
        (i32::from(deci) * 10 + self.kelvin_offset).div_euclid(10)
    }
}

/// Looks up a built-in profile by name.
pub fn profile_by_name(name: &str) -> Option<&'static BusProfile> {
    [&TIN_PROFILE, &LIN13_PROFILE].into_iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// LIN 1.x: identifier bits 4 and 5 select a 2, 4 or 8 byte response.
pub fn lin_default_length(id: FrameId) -> usize {
    match id.raw() >> 4 {
        0 | 1 => 2,
        2 => 4,
        _ => 8,
    }
}

/// Frame table of the heater's TIN bus.
pub static TIN_FRAMES: [FrameLayout; 6] = [
    FrameLayout {
        id: FrameId::from_const(0x03),
        kind: FrameKind::AirHeaterCommand,
        name: "Air Heater Command",
        payload_len: 2,
    },
    FrameLayout {
        id: FrameId::from_const(0x04),
        kind: FrameKind::WaterHeaterCommand,
        name: "Water Heater Command",
        payload_len: 2,
    },
    FrameLayout {
        id: FrameId::from_const(0x05),
        kind: FrameKind::FuelCommand,
        name: "Fuel Command",
        payload_len: 1,
    },
    FrameLayout {
        id: FrameId::from_const(0x06),
        kind: FrameKind::ElectroCommand,
        name: "Electro Command",
        payload_len: 1,
    },
    FrameLayout {
        id: FrameId::from_const(0x07),
        kind: FrameKind::VentCommand,
        name: "Vent Command",
        payload_len: 1,
    },
    FrameLayout {
        id: FrameId::from_const(0x16),
        kind: FrameKind::Info,
        name: "Info (Status)",
        payload_len: 8,
    },
];

/// The heater's TIN bus: uninverted parity, plain-sum checksum, tenths of a
/// kelvin over 273.15 K.
pub static TIN_PROFILE: BusProfile = BusProfile {
    name: "tin",
    format: FrameFormat::TIN,
    frames: &TIN_FRAMES,
    kelvin_offset: 27315,
};

/// [`TIN_FRAMES`] framed as strict LIN 1.3.
pub static LIN13_PROFILE: BusProfile = BusProfile {
    name: "lin13",
    format: FrameFormat::LIN13,
    frames: &TIN_FRAMES,
    kelvin_offset: 27315,
};
