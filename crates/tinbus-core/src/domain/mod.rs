//! Domain layer: field identities, typed values and commands.
//!
//! Nothing in here knows about bytes on the wire; the mapping between these
//! types and frame payloads lives in [`crate::protocol::codec`].

pub mod command;
pub mod fields;

pub use command::{Command, CommandError, AIR_TARGET_RANGE, WATER_TARGET_RANGE};
pub use fields::{
    Field, FieldError, FieldUpdate, FieldValue, FuelMode, Level, SelectField, StatusCode,
    SwitchField, Temperature, ELECTRO_POWER_OPTIONS, VENT_SPEED_OPTIONS,
};
