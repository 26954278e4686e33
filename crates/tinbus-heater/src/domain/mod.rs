//! Domain layer for tinbus-heater.
//!
//! Pure types with no I/O: the sink slots decoded fields are delivered to, and
//! the rules that turn switch requests into fuel commands.

pub mod sinks;
pub mod switches;

pub use sinks::{FieldSinks, SelectSink, SensorSink, SwitchSink};
pub use switches::{ControlRequest, FuelState};
