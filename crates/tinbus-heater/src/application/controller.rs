//! The standalone heater controller: one Link, one decoder, field sinks.
//!
//! # Poll cycle
//!
//! Each call to [`HeaterController::poll`] runs to completion without waiting
//! for the bus:
//!
//! 1. Drain received bytes into the Link's decoder; decode completed frames
//!    and hand their fields to the filled sink slots.
//! 2. Evaluate the idle threshold so a half-received frame times out even if
//!    the bus has gone silent.
//! 3. Send queued control requests, one frame each.
//! 4. Send a status request once per update interval.
//!
//! The heater sits on a single-wire bus, so every frame this controller writes
//! is read back by its own decoder.  Command frames echo back as target
//! fields; the status header echoes back followed by the heater's response,
//! which the decoder sees as one info frame.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tinbus_core::protocol::codec::fuel_mode_of;
use tinbus_core::{
    decode_frame, encode_command, status_request, BusProfile, Command, Frame, Link, Transport,
    TransportError,
};

use super::control::ControlHandle;
use crate::domain::{ControlRequest, FieldSinks, FuelState};

/// Upper bound on bytes consumed per poll, so one poll stays short.
pub const MAX_BYTES_PER_POLL: usize = 256;

/// Default depth of the control request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub update_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self { update_interval: Duration::from_secs(10), queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub frames: u64,
    pub unrecognized_frames: u64,
    pub published: u64,
    pub rejected_fields: u64,
    pub commands_sent: u64,
    pub status_requests: u64,
}

pub struct HeaterController<T> {
    link: Link<T>,
    sinks: FieldSinks,
    requests: mpsc::Receiver<ControlRequest>,
    fuel: FuelState,
    update_interval: Duration,
    next_status_at: Option<Instant>,
    stats: ControllerStats,
}

impl<T: Transport> HeaterController<T> {
    /// Builds the controller and the handle the control surface will use.
    pub fn new(link: Link<T>, sinks: FieldSinks, settings: ControllerSettings) -> (Self, ControlHandle) {
        let (tx, requests) = mpsc::channel(settings.queue_capacity.max(1));
        let handle = ControlHandle::new(tx, link.decoder().profile());
        let controller = Self {
            link,
            sinks,
            requests,
            fuel: FuelState::default(),
            update_interval: settings.update_interval,
            next_status_at: None,
            stats: ControllerStats::default(),
        };
        (controller, handle)
    }

    /// Runs one poll cycle.  Returns the number of frames decoded.
    ///
    /// # Errors
    ///
    /// A failing read ends the receive step and a failing write ends the
    /// request step, but every step of the cycle still runs.  The error is
    /// returned at the end, a closed port taking precedence.  Decoder state is
    /// left as it was, so the next poll continues where this one stopped.
    pub fn poll(&mut self, now: Instant) -> Result<usize, TransportError> {
        let mut errors = Vec::new();
        let mut frames = 0;
        for _ in 0..MAX_BYTES_PER_POLL {
            match self.link.receive(now) {
                Ok(Some((_, Some(frame)))) => {
                    self.handle_frame(&frame);
                    frames += 1;
                }
                Ok(Some((_, None))) => {}
                Ok(None) => break,
                Err(e) => {
                    errors.push(e);
                    break;
                }
            }
        }

        if let Some(loss) = self.link.tick(now) {
            debug!("{}: idle timeout dropped {} bytes", self.link.name(), loss.discarded);
        }

        while let Ok(request) = self.requests.try_recv() {
            if let Err(e) = self.send_request(request) {
                errors.push(e);
                break;
            }
        }

        let due = *self.next_status_at.get_or_insert(now + self.update_interval);
        if now >= due {
            self.next_status_at = Some(now + self.update_interval);
            if let Err(e) = self.request_status() {
                errors.push(e);
            }
        }

        let mut errors = errors.into_iter();
        let Some(mut report) = errors.next() else { return Ok(frames) };
        for e in errors {
            if matches!(e, TransportError::Closed) && !matches!(report, TransportError::Closed) {
                warn!("{}: {report}", self.link.name());
                report = e;
            } else {
                warn!("{}: {e}", self.link.name());
            }
        }
        Err(report)
    }

    /// Sends the info-frame header right away.
    pub fn request_status(&mut self) -> Result<(), TransportError> {
        let Some(header) = status_request(self.profile()) else {
            warn!("bus profile {} has no info frame", self.profile().name);
            return Ok(());
        };
        self.link.send(&header)?;
        self.stats.status_requests += 1;
        debug!("status request sent");
        Ok(())
    }

    /// Startup dump of what this controller will publish.
    pub fn log_config(&self) {
        info!("TIN bus heater controller:");
        info!("  Link: {}", self.link.name());
        info!("  Bus profile: {}", self.profile().name);
        info!("  Update interval: {} ms", self.update_interval.as_millis());
        info!("  Idle timeout: {} ms", self.link.decoder().idle_timeout().as_millis());
        for field in self.sinks.enabled() {
            info!("  {field}: enabled");
        }
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn fuel_state(&self) -> FuelState {
        self.fuel
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    fn profile(&self) -> &'static BusProfile {
        self.link.decoder().profile()
    }

    fn handle_frame(&mut self, frame: &Frame) {
        let decoded = decode_frame(self.profile(), frame);
        self.stats.frames += 1;
        if !decoded.is_recognized() {
            self.stats.unrecognized_frames += 1;
            debug!("ignoring frame {}", decoded.id);
            return;
        }

        for e in &decoded.rejected {
            debug!("{}: dropped field: {e}", decoded.name());
            self.stats.rejected_fields += 1;
        }
        if let Some(mode) = fuel_mode_of(&decoded) {
            self.fuel.observe(mode);
        }
        for update in &decoded.updates {
            if self.sinks.dispatch(update) {
                self.stats.published += 1;
            }
        }
        debug!("{}: {} fields", decoded.name(), decoded.updates.len());
    }

    fn send_request(&mut self, request: ControlRequest) -> Result<(), TransportError> {
        let command = match request {
            ControlRequest::Command(cmd) => cmd,
            ControlRequest::Switch { switch, on } => {
                Command::SetFuel(self.fuel.resolve(switch, on))
            }
        };
        let frame = match encode_command(self.profile(), &command) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("dropping request {request}: {e}");
                return Ok(());
            }
        };
        self.link.send(&frame.to_wire())?;
        self.stats.commands_sent += 1;
        info!("sent {command}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sinks::{MockSelectSink, MockSensorSink, MockSwitchSink};
    use mockall::predicate::eq;
    use tinbus_core::{FrameDecoder, FrameId, MemoryTransport, SelectField, SwitchField, TIN_PROFILE};

    fn controller(
        sinks: FieldSinks,
    ) -> (HeaterController<MemoryTransport>, ControlHandle, MemoryTransport) {
        let wire = MemoryTransport::new();
        let link = Link::new("heater", wire.clone(), FrameDecoder::default());
        let (ctl, handle) = HeaterController::new(link, sinks, ControllerSettings::default());
        (ctl, handle, wire)
    }

    fn info_wire(air_raw: u16, fuel: u8, vent: u8) -> Vec<u8> {
        let [a0, a1] = air_raw.to_le_bytes();
        Frame::new(
            FrameId::new(0x16).unwrap(),
            vec![a0, a1, 0x9E, 0x0C, 0x00, fuel, 0x00, vent],
            TIN_PROFILE.format,
        )
        .unwrap()
        .to_wire()
    }

    #[test]
    fn test_status_frame_reaches_only_configured_sinks() {
        // Arrange: only air temperature and vent speed are wanted.
        let mut air = MockSensorSink::new();
        air.expect_publish().with(eq(21.5)).times(1).return_const(());
        let mut vent = MockSelectSink::new();
        vent.expect_publish().withf(|l| l.index() == 3).times(1).return_const(());
        let sinks = FieldSinks {
            air_temperature: Some(Box::new(air)),
            vent_speed: Some(Box::new(vent)),
            ..Default::default()
        };
        let (mut ctl, _handle, wire) = controller(sinks);
        wire.push_inbound(&info_wire(2946, 0x01, 3));

        // Act
        let frames = ctl.poll(Instant::now()).unwrap();

        // Assert
        assert_eq!(frames, 1);
        assert_eq!(ctl.stats().published, 2);
    }

    #[test]
    fn test_switch_request_uses_reported_fuel_mode() {
        // Arrange: heater reports gas only.
        let mut power = MockSwitchSink::new();
        power.expect_publish().with(eq(true)).times(1).return_const(());
        let sinks = FieldSinks { power: Some(Box::new(power)), ..Default::default() };
        let (mut ctl, handle, wire) = controller(sinks);
        wire.push_inbound(&info_wire(2946, 0x01, 0));
        let now = Instant::now();
        ctl.poll(now).unwrap();

        // Act: turn the electric element on as well.
        handle.set_switch(SwitchField::FuelElectro, true).unwrap();
        ctl.poll(now).unwrap();

        // Assert: fuel command with both bits set.
        let fuel = encode_command(ctl.profile(), &Command::SetFuel(tinbus_core::FuelMode {
            gas: true,
            electro: true,
        }))
        .unwrap();
        assert_eq!(wire.take_written(), fuel.to_wire());
        assert_eq!(ctl.stats().commands_sent, 1);
    }

    #[test]
    fn test_status_request_sent_once_per_interval() {
        let (mut ctl, _handle, wire) = controller(FieldSinks::default());
        let t0 = Instant::now();

        ctl.poll(t0).unwrap();
        assert!(wire.take_written().is_empty());

        ctl.poll(t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(wire.take_written(), vec![0x00, 0x55, 0x56]);

        ctl.poll(t0 + Duration::from_secs(15)).unwrap();
        assert!(wire.take_written().is_empty());
        assert_eq!(ctl.stats().status_requests, 1);
    }

    #[test]
    fn test_write_failure_is_reported_and_decoder_untouched() {
        let (mut ctl, handle, wire) = controller(FieldSinks::default());
        let now = Instant::now();
        wire.push_inbound(&info_wire(2946, 0, 0)[..4]);
        handle.set_select(SelectField::ElectroPower, 1).unwrap();
        wire.set_fail_writes(true);

        assert!(ctl.poll(now).is_err());
        assert_eq!(ctl.link().decoder().buffered(), 3);
    }

    #[test]
    fn test_unknown_frame_is_counted_not_dispatched() {
        let (mut ctl, _handle, wire) = controller(FieldSinks::default());
        let frame =
            Frame::new(FrameId::new(0x20).unwrap(), vec![1, 2, 3, 4], TIN_PROFILE.format).unwrap();
        wire.push_inbound(&frame.to_wire());

        ctl.poll(Instant::now()).unwrap();

        assert_eq!(ctl.stats().unrecognized_frames, 1);
        assert_eq!(ctl.stats().published, 0);
    }

    #[test]
    fn test_read_failure_still_sends_requests_and_status_polls() {
        // Arrange: every read fails, one command is queued.
        let (mut ctl, handle, wire) = controller(FieldSinks::default());
        let t0 = Instant::now();
        wire.set_fail_reads(true);
        handle.set_select(SelectField::VentSpeed, 2).unwrap();

        // Act
        let first = ctl.poll(t0);
        let second = ctl.poll(t0 + Duration::from_secs(10));

        // Assert
        assert!(matches!(first, Err(TransportError::Io(_))));
        assert!(second.is_err());
        let vent = encode_command(&TIN_PROFILE, &Command::SetLevel {
            select: SelectField::VentSpeed,
            index: 2,
        })
        .unwrap();
        let mut expected = vent.to_wire();
        expected.extend([0x00, 0x55, 0x56]);
        assert_eq!(wire.take_written(), expected);
        assert_eq!(ctl.stats().commands_sent, 1);
        assert_eq!(ctl.stats().status_requests, 1);
    }
}
