//! Consumers of decoded field values.
//!
//! The embedding system decides once, at construction, which fields it wants.
//! Each wanted field gets a sink in its slot of [`FieldSinks`]; empty slots
//! are simply skipped on dispatch.  The controller never asks what a sink is,
//! only whether the slot is filled.

use tinbus_core::{Field, FieldUpdate, FieldValue, Level};

/// Receives numeric readings: temperatures in °C, the status code as a number.
#[cfg_attr(test, mockall::automock)]
pub trait SensorSink: Send {
    fn publish(&mut self, value: f32);
}

/// Receives on/off states.
#[cfg_attr(test, mockall::automock)]
pub trait SwitchSink: Send {
    fn publish(&mut self, on: bool);
}

/// Receives option-list positions.
#[cfg_attr(test, mockall::automock)]
pub trait SelectSink: Send {
    fn publish(&mut self, level: Level);
}

/// One optional sink per field the heater can report.
#[derive(Default)]
pub struct FieldSinks {
    pub air_temperature: Option<Box<dyn SensorSink>>,
    pub water_temperature: Option<Box<dyn SensorSink>>,
    pub status: Option<Box<dyn SensorSink>>,
    pub air_target: Option<Box<dyn SensorSink>>,
    pub water_target: Option<Box<dyn SensorSink>>,
    pub power: Option<Box<dyn SwitchSink>>,
    pub fuel_gas: Option<Box<dyn SwitchSink>>,
    pub fuel_electro: Option<Box<dyn SwitchSink>>,
    pub vent_speed: Option<Box<dyn SelectSink>>,
    pub electro_power: Option<Box<dyn SelectSink>>,
}

impl FieldSinks {
    /// Delivers `update` to its slot.  Returns `false` if the slot is empty.
    pub fn dispatch(&mut self, update: &FieldUpdate) -> bool {
        let delivered = match update.value {
            FieldValue::Temperature(t) => self.sensor(update.field).map(|s| s.publish(t.celsius())),
            FieldValue::Status(code) => {
                self.sensor(update.field).map(|s| s.publish(f32::from(code.0)))
            }
            FieldValue::Switch(on) => self.switch(update.field).map(|s| s.publish(on)),
            FieldValue::Level(level) => self.select(update.field).map(|s| s.publish(level)),
        };
        delivered.is_some()
    }

    /// Fields that have a sink, in declaration order.
    pub fn enabled(&self) -> Vec<Field> {
        let slots = [
            (Field::AirTemperature, self.air_temperature.is_some()),
            (Field::WaterTemperature, self.water_temperature.is_some()),
            (Field::Status, self.status.is_some()),
            (Field::AirTarget, self.air_target.is_some()),
            (Field::WaterTarget, self.water_target.is_some()),
            (Field::Power, self.power.is_some()),
            (Field::FuelGas, self.fuel_gas.is_some()),
            (Field::FuelElectro, self.fuel_electro.is_some()),
            (Field::VentSpeed, self.vent_speed.is_some()),
            (Field::ElectroPower, self.electro_power.is_some()),
        ];
        slots.into_iter().filter(|&(_, on)| on).map(|(f, _)| f).collect()
    }

    fn sensor(&mut self, field: Field) -> Option<&mut Box<dyn SensorSink>> {
        match field {
            Field::AirTemperature => self.air_temperature.as_mut(),
            Field::WaterTemperature => self.water_temperature.as_mut(),
            Field::Status => self.status.as_mut(),
            Field::AirTarget => self.air_target.as_mut(),
            Field::WaterTarget => self.water_target.as_mut(),
            _ => None,
        }
    }

    fn switch(&mut self, field: Field) -> Option<&mut Box<dyn SwitchSink>> {
        match field {
            Field::Power => self.power.as_mut(),
            Field::FuelGas => self.fuel_gas.as_mut(),
            Field::FuelElectro => self.fuel_electro.as_mut(),
            _ => None,
        }
    }

    fn select(&mut self, field: Field) -> Option<&mut Box<dyn SelectSink>> {
        match field {
            Field::VentSpeed => self.vent_speed.as_mut(),
            Field::ElectroPower => self.electro_power.as_mut(),
            _ => None,
        }
    }
}
