//! Integration tests for the heater controller over an in-memory Link.
//!
//! The bus is simulated with [`MemoryTransport`]: bytes the controller writes
//! can be looped back (single-wire echo) and the heater's responses pushed
//! in, so a full status poll can be exercised end to end.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tinbus_core::{
    Frame, FrameDecoder, FrameId, Level, Link, MemoryTransport, SwitchField, TIN_PROFILE,
};
use tinbus_heater::{
    ControlError, ControllerSettings, FieldSinks, HeaterController, SelectSink, SensorSink,
    SwitchSink,
};

#[derive(Clone)]
struct Recorder<V>(Arc<Mutex<Vec<V>>>);

impl<V> Default for Recorder<V> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<V: Clone> Recorder<V> {
    fn values(&self) -> Vec<V> {
        self.0.lock().unwrap().clone()
    }
}

impl SensorSink for Recorder<f32> {
    fn publish(&mut self, value: f32) {
        self.0.lock().unwrap().push(value);
    }
}

impl SwitchSink for Recorder<bool> {
    fn publish(&mut self, on: bool) {
        self.0.lock().unwrap().push(on);
    }
}

impl SelectSink for Recorder<Level> {
    fn publish(&mut self, level: Level) {
        self.0.lock().unwrap().push(level);
    }
}

/// Data bytes plus checksum of an info response.
fn info_response(air_raw: u16, water_raw: u16, fuel: u8, electro: u8, vent: u8) -> Vec<u8> {
    let [a0, a1] = air_raw.to_le_bytes();
    let [w0, w1] = water_raw.to_le_bytes();
    let frame = Frame::new(
        FrameId::new(0x16).unwrap(),
        vec![a0, a1, w0, w1, 0x05, fuel, electro, vent],
        TIN_PROFILE.format,
    )
    .unwrap();
    frame.response_bytes()
}

/// Records `name=value` for every delivery, whichever slot it came through.
#[derive(Clone)]
struct Tagged {
    name: &'static str,
    log: Recorder<String>,
}

impl SensorSink for Tagged {
    fn publish(&mut self, value: f32) {
        self.log.0.lock().unwrap().push(format!("{}={value}", self.name));
    }
}

impl SelectSink for Tagged {
    fn publish(&mut self, level: Level) {
        self.log.0.lock().unwrap().push(format!("{}={}", self.name, level.index()));
    }
}

struct Bench {
    controller: HeaterController<MemoryTransport>,
    control: tinbus_heater::ControlHandle,
    wire: MemoryTransport,
    air: Recorder<f32>,
    water_target: Recorder<f32>,
    power: Recorder<bool>,
    vent: Recorder<Level>,
}

fn bench() -> Bench {
    let wire = MemoryTransport::new();
    let air = Recorder::default();
    let water_target = Recorder::default();
    let power = Recorder::default();
    let vent = Recorder::default();
    let sinks = FieldSinks {
        air_temperature: Some(Box::new(air.clone())),
        water_target: Some(Box::new(water_target.clone())),
        power: Some(Box::new(power.clone())),
        vent_speed: Some(Box::new(vent.clone())),
        ..Default::default()
    };
    let link = Link::new("heater", wire.clone(), FrameDecoder::default());
    let settings =
        ControllerSettings { update_interval: Duration::from_secs(10), ..Default::default() };
    let (controller, control) = HeaterController::new(link, sinks, settings);
    Bench { controller, control, wire, air, water_target, power, vent }
}

/// Loops everything the controller wrote back onto its receive side.
fn echo(wire: &MemoryTransport) {
    let written = wire.take_written();
    wire.push_inbound(&written);
}

#[test]
fn test_status_poll_round_trip_over_single_wire() {
    // Arrange
    let mut b = bench();
    let t0 = Instant::now();
    b.controller.poll(t0).unwrap();

    // Act: the interval elapses, the header echoes, the heater answers.
    let t1 = t0 + Duration::from_secs(10);
    b.controller.poll(t1).unwrap();
    echo(&b.wire);
    b.wire.push_inbound(&info_response(2946, 3281, 0x01, 0, 4));
    b.controller.poll(t1 + Duration::from_millis(5)).unwrap();

    // Assert
    assert_eq!(b.air.values(), vec![21.5]);
    assert_eq!(b.power.values(), vec![true]);
    let vent = b.vent.values();
    assert_eq!(vent.len(), 1);
    assert_eq!(vent[0].option(), "Speed 4");
}

#[test]
fn test_echoed_command_publishes_target() {
    let mut b = bench();
    let now = Instant::now();

    b.control.set_water_target(55.0).unwrap();
    b.controller.poll(now).unwrap();
    echo(&b.wire);
    b.controller.poll(now).unwrap();

    assert_eq!(b.water_target.values(), vec![55.0]);
}

#[test]
fn test_heater_silent_after_header_times_out_cleanly() {
    // Arrange: header echoes but the heater never answers.
    let mut b = bench();
    let t0 = Instant::now();
    b.controller.request_status().unwrap();
    echo(&b.wire);
    b.controller.poll(t0).unwrap();
    assert!(b.controller.link().decoder().in_frame());

    // Act
    b.controller.poll(t0 + Duration::from_millis(150)).unwrap();

    // Assert
    assert!(!b.controller.link().decoder().in_frame());
    assert_eq!(b.controller.link().decoder().stats().sync_losses, 1);
    assert!(b.air.values().is_empty());
}

#[test]
fn test_power_on_after_off_restores_previous_mode() {
    let mut b = bench();
    let now = Instant::now();
    b.wire.push_inbound(&[0x00, 0x55, 0x56]);
    b.wire.push_inbound(&info_response(2946, 3281, 0x02, 1, 0));
    b.controller.poll(now).unwrap();
    b.wire.push_inbound(&[0x00, 0x55, 0x56]);
    b.wire.push_inbound(&info_response(2946, 3281, 0x00, 0, 0));
    b.controller.poll(now).unwrap();

    b.control.set_switch(SwitchField::Power, true).unwrap();
    b.controller.poll(now).unwrap();

    // Fuel command (id 0x05) carrying the electric-only mode.
    let written = b.wire.take_written();
    let fuel_pid = TIN_PROFILE.format.protect(FrameId::new(0x05).unwrap());
    assert_eq!(&written[..4], &[0x00, 0x55, fuel_pid, 0x02]);
    assert_eq!(b.power.values(), vec![true, false]);
}

#[test]
fn test_invalid_request_never_reaches_the_wire() {
    let mut b = bench();

    let err = b.control.set_select(tinbus_core::SelectField::VentSpeed, 9).unwrap_err();
    b.controller.poll(Instant::now()).unwrap();

    assert!(matches!(err, ControlError::Invalid(_)));
    assert!(b.wire.written().is_empty());
}

#[test]
fn test_status_frame_delivers_exactly_the_configured_fields() {
    // Arrange: air temperature and vent speed are the only filled slots.
    let log = Recorder::<String>::default();
    let sinks = FieldSinks {
        air_temperature: Some(Box::new(Tagged { name: "air", log: log.clone() })),
        vent_speed: Some(Box::new(Tagged { name: "vent", log: log.clone() })),
        ..Default::default()
    };
    let wire = MemoryTransport::new();
    let link = Link::new("heater", wire.clone(), FrameDecoder::default());
    let (mut controller, _control) =
        HeaterController::new(link, sinks, ControllerSettings::default());
    wire.push_inbound(&[0x00, 0x55, 0x56]);
    wire.push_inbound(&info_response(2946, 3281, 0x03, 2, 3));

    // Act
    let frames = controller.poll(Instant::now()).unwrap();

    // Assert
    assert_eq!(frames, 1);
    assert_eq!(log.values(), vec!["air=21.5".to_string(), "vent=3".to_string()]);
    assert_eq!(controller.stats().published, 2);
}
