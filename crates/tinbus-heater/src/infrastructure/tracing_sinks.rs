//! Sinks that publish field values as structured `tracing` events.
//!
//! This is what the binary uses when no richer presentation layer is attached:
//! every value becomes one event on target `tinbus::fields`, with the field
//! name and value as structured fields, so a subscriber can filter or export
//! them.

use tracing::info;

use tinbus_core::{Field, Level};

use super::config::FieldsConfig;
use crate::domain::{FieldSinks, SelectSink, SensorSink, SwitchSink};

/// Logs each published value under its field name.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    field: Field,
}

impl TracingSink {
    pub fn new(field: Field) -> Self {
        Self { field }
    }
}

impl SensorSink for TracingSink {
    fn publish(&mut self, value: f32) {
        info!(target: "tinbus::fields", field = self.field.name(), value, "sensor");
    }
}

impl SwitchSink for TracingSink {
    fn publish(&mut self, on: bool) {
        info!(target: "tinbus::fields", field = self.field.name(), on, "switch");
    }
}

impl SelectSink for TracingSink {
    fn publish(&mut self, level: Level) {
        info!(
            target: "tinbus::fields",
            field = self.field.name(),
            index = level.index(),
            option = level.option(),
            "select"
        );
    }
}

/// Fills the slots enabled in `fields` with [`TracingSink`]s.
pub fn tracing_sinks(fields: &FieldsConfig) -> FieldSinks {
    fn sensor(on: bool, field: Field) -> Option<Box<dyn SensorSink>> {
        on.then(|| Box::new(TracingSink::new(field)) as Box<dyn SensorSink>)
    }
    fn switch(on: bool, field: Field) -> Option<Box<dyn SwitchSink>> {
        on.then(|| Box::new(TracingSink::new(field)) as Box<dyn SwitchSink>)
    }
    fn select(on: bool, field: Field) -> Option<Box<dyn SelectSink>> {
        on.then(|| Box::new(TracingSink::new(field)) as Box<dyn SelectSink>)
    }

    FieldSinks {
        air_temperature: sensor(fields.air_temperature, Field::AirTemperature),
        water_temperature: sensor(fields.water_temperature, Field::WaterTemperature),
        status: sensor(fields.status, Field::Status),
        air_target: sensor(fields.air_target, Field::AirTarget),
        water_target: sensor(fields.water_target, Field::WaterTarget),
        power: switch(fields.power, Field::Power),
        fuel_gas: switch(fields.fuel_gas, Field::FuelGas),
        fuel_electro: switch(fields.fuel_electro, Field::FuelElectro),
        vent_speed: select(fields.vent_speed, Field::VentSpeed),
        electro_power: select(fields.electro_power, Field::ElectroPower),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fields_fill_measured_slots() {
        let sinks = tracing_sinks(&FieldsConfig::default());
        let enabled = sinks.enabled();
        assert!(enabled.contains(&Field::AirTemperature));
        assert!(enabled.contains(&Field::VentSpeed));
        assert!(!enabled.contains(&Field::AirTarget));
        assert_eq!(enabled.len(), 8);
    }

    #[test]
    fn test_disabled_fields_leave_slots_empty() {
        let fields = FieldsConfig {
            air_temperature: false,
            water_temperature: false,
            status: false,
            air_target: false,
            water_target: false,
            power: false,
            fuel_gas: false,
            fuel_electro: false,
            vent_speed: true,
            electro_power: false,
        };
        assert_eq!(tracing_sinks(&fields).enabled(), vec![Field::VentSpeed]);
    }
}
