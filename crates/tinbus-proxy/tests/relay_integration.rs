//! Integration tests for the proxy over two in-memory Links.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tinbus_core::{
    encode_command, Command, Frame, FrameDecoder, FrameId, Link, MemoryTransport, SelectField,
    TIN_PROFILE,
};
use tinbus_proxy::domain::LogSinkError;
use tinbus_proxy::infrastructure::LastLineSink;
use tinbus_proxy::{BusProxy, Direction, LogSink, ProxyError, ProxyMode, ProxySettings, Side};

struct Rig {
    proxy: BusProxy<MemoryTransport>,
    panel: MemoryTransport,
    heater: MemoryTransport,
}

fn rig(mode: ProxyMode) -> Rig {
    let panel = MemoryTransport::new();
    let heater = MemoryTransport::new();
    let proxy = BusProxy::new(
        Link::new("panel", panel.clone(), FrameDecoder::default()),
        Link::new("heater", heater.clone(), FrameDecoder::default()),
        ProxySettings { mode, ..ProxySettings::default() },
    );
    Rig { proxy, panel, heater }
}

/// Polls until both inbound queues are drained.
fn drain(r: &mut Rig, now: Instant) {
    while r.panel.pending_inbound() > 0 || r.heater.pending_inbound() > 0 {
        r.proxy.poll(now).unwrap();
    }
}

struct BrokenSink;

impl LogSink for BrokenSink {
    fn write_line(&mut self, _line: &str) -> Result<(), LogSinkError> {
        Err(LogSinkError::Unavailable("unplugged".into()))
    }
}

fn vent(index: u8) -> Command {
    Command::SetLevel { select: SelectField::VentSpeed, index }
}

/// Valid frames, a corrupted checksum, a bad PID, stray noise and a
/// truncated frame, long enough to need several polls.
fn messy_traffic() -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..60u8 {
        bytes.extend(encode_command(&TIN_PROFILE, &vent(i % 8)).unwrap().to_wire());
    }
    let mut corrupt = encode_command(&TIN_PROFILE, &vent(1)).unwrap().to_wire();
    if let Some(last) = corrupt.last_mut() {
        *last ^= 0xFF;
    }
    bytes.extend(corrupt);
    bytes.extend([0x55, 0x07, 0x01, 0x02]);
    bytes.extend([0xFF, 0x13, 0x00, 0x37]);
    bytes.extend([0x00, 0x55, 0x56, 0x82]);
    bytes
}

#[test]
fn test_relay_is_transparent_even_when_logging_fails() {
    // Arrange
    let mut r = rig(ProxyMode::Passive);
    r.proxy.set_log_sink(Some(Box::new(BrokenSink)));
    let now = Instant::now();
    r.proxy.start(now);
    let upstream = messy_traffic();
    let downstream: Vec<u8> = upstream.iter().rev().copied().collect();
    r.panel.push_inbound(&upstream);
    r.heater.push_inbound(&downstream);

    // Act
    drain(&mut r, now);

    // Assert
    assert_eq!(r.heater.written(), upstream);
    assert_eq!(r.panel.written(), downstream);
    let stats = r.proxy.stats();
    assert_eq!(stats.panel_to_heater.bytes_forwarded, upstream.len() as u64);
    assert_eq!(
        stats.direction(Direction::HeaterToPanel).bytes_forwarded,
        downstream.len() as u64
    );
    assert!(stats.panel_to_heater.frames >= 60);
    assert_eq!(stats.log_failures, stats.panel_to_heater.frames + stats.heater_to_panel.frames);
}

/// Keeps every summary line.
#[derive(Clone, Default)]
struct Lines(Arc<Mutex<Vec<String>>>);

impl Lines {
    fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl LogSink for Lines {
    fn write_line(&mut self, line: &str) -> Result<(), LogSinkError> {
        self.0.lock().unwrap().push(line.to_owned());
        Ok(())
    }
}

fn info_frame() -> Frame {
    // 21.5 °C air and 55.0 °C water as the heater sends them (2946, 3281).
    let [a0, a1] = 2946u16.to_le_bytes();
    let [w0, w1] = 3281u16.to_le_bytes();
    Frame::new(FrameId::new(0x16).unwrap(), vec![a0, a1, w0, w1, 0x05, 1, 2, 3], TIN_PROFILE.format)
        .unwrap()
}

#[test]
fn test_status_exchange_split_across_links_is_summarized() {
    // Arrange
    let mut r = rig(ProxyMode::Passive);
    let lines = Lines::default();
    r.proxy.set_log_sink(Some(Box::new(lines.clone())));
    let t0 = Instant::now();
    r.proxy.start(t0);
    let info = info_frame();
    let vent3 = encode_command(&TIN_PROFILE, &vent(3)).unwrap().to_wire();

    // Act: header from the panel, response from the heater, then a command.
    r.panel.push_inbound(&[0x00, 0x55, 0x56]);
    r.proxy.poll(t0).unwrap();
    r.heater.push_inbound(&info.response_bytes());
    r.proxy.poll(t0 + Duration::from_millis(2)).unwrap();
    r.panel.push_inbound(&vent3);
    r.proxy.poll(t0 + Duration::from_millis(22)).unwrap();

    // Assert
    let lines = lines.all();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].starts_with("[2] heater->panel: 0x16 Info (Status):"), "{}", lines[0]);
    assert!(lines[0].contains("air_temperature=21.5°C"), "{}", lines[0]);
    assert!(lines[0].contains("water_temperature=55.0°C"), "{}", lines[0]);
    assert!(lines[0].contains("vent_speed=3"), "{}", lines[0]);
    assert!(lines[1].starts_with("[22] panel->heater: 0x07 Vent Command: vent_speed=3"), "{}", lines[1]);
    assert_eq!(r.panel.written(), info.response_bytes());
    let mut upstream = vec![0x00, 0x55, 0x56];
    upstream.extend(&vent3);
    assert_eq!(r.heater.written(), upstream);
}

#[test]
fn test_full_frame_from_heater_is_summarized_to_last_line_sink() {
    let mut r = rig(ProxyMode::Passive);
    let latest = LastLineSink::new();
    r.proxy.set_log_sink(Some(Box::new(latest.clone())));
    let now = Instant::now();
    r.proxy.start(now);
    r.heater.push_inbound(&info_frame().to_wire());

    drain(&mut r, now);

    let line = latest.latest().unwrap();
    assert!(line.starts_with("[0] heater->panel: 0x16 Info (Status):"), "{line}");
    assert!(line.ends_with("| 55 56 82 0B D1 0C 05 01 02 03 75"), "{line}");
}

#[test]
fn test_failing_panel_port_does_not_starve_heater_to_panel() {
    // Arrange
    let mut r = rig(ProxyMode::Passive);
    let now = Instant::now();
    r.proxy.start(now);
    r.panel.set_fail_reads(true);
    let response = info_frame().response_bytes();
    r.heater.push_inbound(&response);

    // Act
    let results: Vec<_> = (0..3).map(|_| r.proxy.poll(now)).collect();

    // Assert
    assert!(results.iter().all(|res| matches!(res, Err(ProxyError::Receive { side: Side::Panel, .. }))));
    assert_eq!(r.heater.pending_inbound(), 0);
    assert_eq!(r.panel.written(), response);
}

#[test]
fn test_passive_mode_never_adds_bytes() {
    // Arrange
    let mut r = rig(ProxyMode::Passive);
    let t0 = Instant::now();
    r.proxy.start(t0);
    let upstream = messy_traffic();
    r.panel.push_inbound(&upstream);

    // Act
    for i in 0..8 {
        assert_eq!(r.proxy.originate(Side::Heater, &vent(2)), Ok(false));
        assert_eq!(r.proxy.originate(Side::Panel, &vent(2)), Ok(false));
        r.proxy.poll(t0 + Duration::from_millis(200 * i)).unwrap();
    }

    // Assert
    assert_eq!(r.heater.written(), upstream);
    assert!(r.panel.written().is_empty());
    assert_eq!(r.proxy.stats().injected_frames, 0);
}

#[test]
fn test_injection_lands_between_relayed_frames() {
    // Arrange: the panel is partway through a vent command to the heater.
    let mut r = rig(ProxyMode::Active);
    let t0 = Instant::now();
    r.proxy.start(t0);
    let relayed = encode_command(&TIN_PROFILE, &vent(5)).unwrap().to_wire();
    r.panel.push_inbound(&relayed[..3]);
    r.proxy.poll(t0).unwrap();

    // Act
    r.proxy.originate(Side::Heater, &vent(1)).unwrap();
    r.proxy.poll(t0 + Duration::from_millis(1)).unwrap();
    r.panel.push_inbound(&relayed[3..]);
    r.proxy.poll(t0 + Duration::from_millis(2)).unwrap();
    r.proxy.poll(t0 + Duration::from_millis(10)).unwrap();
    let before_gap = r.heater.written();
    r.proxy.poll(t0 + Duration::from_millis(40)).unwrap();

    // Assert
    assert_eq!(before_gap, relayed);
    let mut expected = relayed.clone();
    expected.extend(encode_command(&TIN_PROFILE, &vent(1)).unwrap().to_wire());
    assert_eq!(r.heater.written(), expected);
    assert_eq!(r.proxy.stats().injected_frames, 1);
}

#[test]
fn test_stop_drops_pending_injections() {
    let mut r = rig(ProxyMode::Active);
    let t0 = Instant::now();
    r.proxy.start(t0);
    r.panel.push_inbound(&[0x00, 0x55, 0xC7]);
    r.proxy.poll(t0).unwrap();
    r.proxy.originate(Side::Heater, &vent(4)).unwrap();
    r.proxy.originate(Side::Panel, &vent(4)).unwrap();

    let dropped = r.proxy.stop();
    r.proxy.poll(t0 + Duration::from_secs(1)).unwrap();

    assert_eq!(dropped, 10);
    assert_eq!(r.proxy.pending_injection_bytes(), 0);
    assert_eq!(r.proxy.stats().dropped_injected_bytes, 10);
    assert_eq!(r.heater.written(), vec![0x00, 0x55, 0xC7]);
    assert!(r.panel.written().is_empty());
}

#[test]
fn test_failed_injection_is_reported_and_dropped() {
    let mut r = rig(ProxyMode::Active);
    let t0 = Instant::now();
    r.proxy.start(t0);
    r.heater.set_fail_writes(true);
    r.proxy.originate(Side::Heater, &vent(6)).unwrap();

    let err = r.proxy.poll(t0).unwrap_err();

    assert!(matches!(err, ProxyError::Inject { side: Side::Heater, .. }));
    assert_eq!(r.proxy.pending_injection_bytes(), 0);
    assert_eq!(r.proxy.stats().dropped_injected_bytes, 5);
}
