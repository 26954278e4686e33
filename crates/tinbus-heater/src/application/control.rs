//! The control surface's way into the controller.
//!
//! [`ControlHandle`] is the single hand-off point between whatever issues
//! requests (a CLI, a UI, an automation) and the poll loop that owns the bus.
//! Requests that carry a full [`Command`] are encoded here, on the caller's
//! side, so a value outside its domain fails immediately and nothing is
//! queued.

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use tinbus_core::{
    encode_command, BusProfile, Command, CommandError, SelectField, SwitchField, Temperature,
};

use crate::domain::ControlRequest;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("rejected: {0}")]
    Invalid(#[from] CommandError),

    #[error("control queue is full")]
    QueueFull,

    #[error("heater controller is no longer running")]
    Closed,
}

/// Cloneable sender of control requests.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
    profile: &'static BusProfile,
}

impl ControlHandle {
    pub(crate) fn new(tx: mpsc::Sender<ControlRequest>, profile: &'static BusProfile) -> Self {
        Self { tx, profile }
    }

    /// Validates and queues `request`.
    ///
    /// # Errors
    ///
    /// [`ControlError::Invalid`] if the command is outside its domain,
    /// [`ControlError::QueueFull`] / [`ControlError::Closed`] if it cannot be queued.
    pub fn submit(&self, request: ControlRequest) -> Result<(), ControlError> {
        if let ControlRequest::Command(cmd) = &request {
            encode_command(self.profile, cmd)?;
        }
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => ControlError::QueueFull,
            TrySendError::Closed(_) => ControlError::Closed,
        })
    }

    pub fn set_switch(&self, switch: SwitchField, on: bool) -> Result<(), ControlError> {
        self.submit(ControlRequest::Switch { switch, on })
    }

    pub fn set_select(&self, select: SelectField, index: u8) -> Result<(), ControlError> {
        self.submit(ControlRequest::Command(Command::SetLevel { select, index }))
    }

    pub fn set_air_target(&self, celsius: f32) -> Result<(), ControlError> {
        let t = to_temperature(celsius)?;
        self.submit(ControlRequest::Command(Command::SetAirTarget(t)))
    }

    pub fn set_water_target(&self, celsius: f32) -> Result<(), ControlError> {
        let t = to_temperature(celsius)?;
        self.submit(ControlRequest::Command(Command::SetWaterTarget(t)))
    }
}

fn to_temperature(celsius: f32) -> Result<Temperature, CommandError> {
    Temperature::from_celsius(celsius).ok_or_else(|| CommandError::Syntax(celsius.to_string()))
}
