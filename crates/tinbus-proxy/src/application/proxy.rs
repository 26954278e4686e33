//! The dual-Link relay.
//!
//! # Relay order
//!
//! For every byte received on one Link the proxy first writes it to the other
//! Link, and only then feeds it to the observation decoder for that direction.
//! Forwarding therefore costs one byte-write no matter what the decoder, the
//! summary formatter or the log sink do with the byte afterwards.
//!
//! Both directions, the idle checks and the injection flush run on every
//! poll.  A failure in one of them is reported once the whole cycle is done.
//!
//! # Split exchanges
//!
//! A master header often gets its response from the other side: the panel
//! sends `00 55 PID` and the heater answers with data and checksum only.
//! When the first byte arrives on one Link while the decoder of the opposite
//! direction holds a header with no data yet, that header is closed out and
//! its identifier handed to this direction's decoder, which then collects the
//! response as a whole frame.  The decoders still share no buffers.
//!
//! # Modes
//!
//! The injection queues exist only inside [`ModeState::Active`].  In passive
//! mode there is nothing to enqueue into and nothing to flush, so no call can
//! put an originated byte on either Link.
//!
//! # Injection timing
//!
//! An originated frame for Link X is written only while X is between frames:
//! the decoder watching bytes relayed *into* X is not mid-frame and has been
//! quiet for at least the inject gap, and X's own receive side is not
//! mid-frame either.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use tinbus_core::{
    decode_frame, encode_command, BusProfile, Command, CommandError, Frame, Link, Transport,
    TransportError,
};

use crate::domain::{summarize, Direction, LogSink, ProxyMode, ProxyState, Side};

/// Upper bound on bytes relayed per direction per poll.
pub const MAX_BYTES_PER_POLL: usize = 256;

/// Default quiet time required before an injected frame is written.
pub const DEFAULT_INJECT_GAP: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{side}: receive failed: {source}")]
    Receive {
        side: Side,
        #[source]
        source: TransportError,
    },

    #[error("{direction}: forward failed: {source}")]
    Forward {
        direction: Direction,
        #[source]
        source: TransportError,
    },

    #[error("{side}: injected frame dropped: {source}")]
    Inject {
        side: Side,
        #[source]
        source: TransportError,
    },
}

impl ProxyError {
    /// `true` when the underlying port is gone rather than momentarily failing.
    pub fn is_closed(&self) -> bool {
        let (ProxyError::Receive { source, .. }
        | ProxyError::Forward { source, .. }
        | ProxyError::Inject { source, .. }) = self;
        matches!(source, TransportError::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxySettings {
    pub mode: ProxyMode,
    pub inject_gap: Duration,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self { mode: ProxyMode::Passive, inject_gap: DEFAULT_INJECT_GAP }
    }
}

/// Counters for one relay direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionStats {
    pub bytes_forwarded: u64,
    pub frames: u64,
    /// Headers sent this way and answered from the other side.
    pub answered_headers: u64,
    pub unrecognized_frames: u64,
    pub sync_losses: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub panel_to_heater: DirectionStats,
    pub heater_to_panel: DirectionStats,
    pub injected_frames: u64,
    /// Originated bytes discarded by a mode switch, a stop or a failed write.
    pub dropped_injected_bytes: u64,
    pub log_failures: u64,
}

impl ProxyStats {
    pub fn direction(&self, direction: Direction) -> &DirectionStats {
        match direction {
            Direction::PanelToHeater => &self.panel_to_heater,
            Direction::HeaterToPanel => &self.heater_to_panel,
        }
    }

    fn direction_mut(&mut self, direction: Direction) -> &mut DirectionStats {
        match direction {
            Direction::PanelToHeater => &mut self.panel_to_heater,
            Direction::HeaterToPanel => &mut self.heater_to_panel,
        }
    }
}

/// Originated frames waiting for a gap, per target Link.
#[derive(Debug, Default)]
struct InjectionQueues {
    panel: VecDeque<Frame>,
    heater: VecDeque<Frame>,
}

impl InjectionQueues {
    fn queue(&mut self, side: Side) -> &mut VecDeque<Frame> {
        match side {
            Side::Panel => &mut self.panel,
            Side::Heater => &mut self.heater,
        }
    }

    fn pending_bytes(&self) -> usize {
        self.panel.iter().chain(&self.heater).map(|f| f.to_wire().len()).sum()
    }
}

#[derive(Debug)]
enum ModeState {
    Passive,
    Active(InjectionQueues),
}

pub struct BusProxy<T> {
    panel: Link<T>,
    heater: Link<T>,
    state: ProxyState,
    mode: ModeState,
    inject_gap: Duration,
    log_sink: Option<Box<dyn LogSink>>,
    started_at: Option<Instant>,
    stats: ProxyStats,
}

impl<T: Transport> BusProxy<T> {
    pub fn new(panel: Link<T>, heater: Link<T>, settings: ProxySettings) -> Self {
        let mut proxy = Self {
            panel,
            heater,
            state: ProxyState::Idle,
            mode: ModeState::Passive,
            inject_gap: settings.inject_gap,
            log_sink: None,
            started_at: None,
            stats: ProxyStats::default(),
        };
        proxy.set_mode(settings.mode);
        proxy
    }

    /// Installs or removes the summary sink.  `None` turns logging off.
    pub fn set_log_sink(&mut self, sink: Option<Box<dyn LogSink>>) {
        self.log_sink = sink;
    }

    pub fn logging_enabled(&self) -> bool {
        self.log_sink.is_some()
    }

    /// `Idle → Relaying`.  A stopped proxy stays stopped.
    pub fn start(&mut self, now: Instant) {
        match self.state {
            ProxyState::Idle => {
                self.state = ProxyState::Relaying;
                self.started_at = Some(now);
                info!("proxy relaying ({} mode)", self.mode());
            }
            ProxyState::Relaying => {}
            ProxyState::Stopped => warn!("start ignored: proxy is stopped"),
        }
    }

    /// Relays pending bytes in both directions, runs idle detection and
    /// writes due injections.  Returns the number of bytes forwarded.
    ///
    /// # Errors
    ///
    /// A failing direction stops for this poll after the byte in hand has been
    /// fed to its observation decoder.  The other direction, the idle checks
    /// and the injections still run, and the error is returned at the end.
    /// When several steps fail, a closed port wins over the first error and
    /// the rest are logged.
    pub fn poll(&mut self, now: Instant) -> Result<usize, ProxyError> {
        if self.state != ProxyState::Relaying {
            return Ok(0);
        }

        let mut errors = Vec::new();
        let mut forwarded = 0;
        for direction in [Direction::PanelToHeater, Direction::HeaterToPanel] {
            match self.relay(direction, now) {
                Ok(n) => forwarded += n,
                Err(e) => errors.push(e),
            }
        }

        for direction in [Direction::PanelToHeater, Direction::HeaterToPanel] {
            if let Some(loss) = self.source_link(direction).tick(now) {
                trace!("{direction}: idle timeout dropped {} bytes", loss.discarded);
                self.stats.direction_mut(direction).sync_losses += 1;
            }
        }

        self.flush_injections(now, &mut errors);

        let mut errors = errors.into_iter();
        let Some(mut report) = errors.next() else { return Ok(forwarded) };
        for e in errors {
            if e.is_closed() && !report.is_closed() {
                warn!("{report}");
                report = e;
            } else {
                warn!("{e}");
            }
        }
        Err(report)
    }

    /// Originates `command` onto the `target` Link.
    ///
    /// Returns `Ok(true)` when the frame was queued.  In passive mode, or once
    /// stopped, the call is a no-op that returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the [`CommandError`] when the command is outside its domain;
    /// nothing is queued.
    pub fn originate(&mut self, target: Side, command: &Command) -> Result<bool, CommandError> {
        if self.state == ProxyState::Stopped {
            debug!("ignoring {command} for {target}: proxy is stopped");
            return Ok(false);
        }
        let profile = self.profile();
        match &mut self.mode {
            ModeState::Passive => {
                debug!("ignoring {command} for {target}: passive mode");
                Ok(false)
            }
            ModeState::Active(queues) => {
                let frame = encode_command(profile, command)?;
                queues.queue(target).push_back(frame);
                debug!("queued {command} for {target}");
                Ok(true)
            }
        }
    }

    /// Switches mode at the embedding system's request.
    ///
    /// Leaving active mode drops every queued injection.
    pub fn set_mode(&mut self, mode: ProxyMode) {
        match (self.mode(), mode) {
            (ProxyMode::Passive, ProxyMode::Passive) | (ProxyMode::Active, ProxyMode::Active) => {}
            (ProxyMode::Passive, ProxyMode::Active) => {
                self.mode = ModeState::Active(InjectionQueues::default());
                info!("proxy mode: active");
            }
            (ProxyMode::Active, ProxyMode::Passive) => {
                let dropped = self.drop_injections();
                self.mode = ModeState::Passive;
                info!("proxy mode: passive ({dropped} queued bytes dropped)");
            }
        }
    }

    pub fn mode(&self) -> ProxyMode {
        match self.mode {
            ModeState::Passive => ProxyMode::Passive,
            ModeState::Active(_) => ProxyMode::Active,
        }
    }

    /// `→ Stopped`.  Queued injections are dropped, not flushed, and both
    /// observation decoders lose any partial frame.  Returns the number of
    /// injected bytes dropped.
    pub fn stop(&mut self) -> usize {
        if self.state == ProxyState::Stopped {
            return 0;
        }
        let dropped = self.drop_injections();
        self.panel.decoder_mut().reset();
        self.heater.decoder_mut().reset();
        self.state = ProxyState::Stopped;
        info!("proxy stopped ({dropped} queued bytes dropped)");
        dropped
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn stats(&self) -> ProxyStats {
        self.stats
    }

    /// Originated bytes waiting for a gap.
    pub fn pending_injection_bytes(&self) -> usize {
        match &self.mode {
            ModeState::Passive => 0,
            ModeState::Active(queues) => queues.pending_bytes(),
        }
    }

    pub fn link(&self, side: Side) -> &Link<T> {
        match side {
            Side::Panel => &self.panel,
            Side::Heater => &self.heater,
        }
    }

    /// Startup dump of the proxy configuration.
    pub fn log_config(&self) {
        info!("TIN bus proxy:");
        info!("  Mode: {}", self.mode());
        info!("  Logging: {}", if self.logging_enabled() { "enabled" } else { "disabled" });
        info!("  Bus profile: {}", self.profile().name);
        info!("  Inject gap: {} ms", self.inject_gap.as_millis());
    }

    // ── Relay ─────────────────────────────────────────────────────────────────

    fn relay(&mut self, direction: Direction, now: Instant) -> Result<usize, ProxyError> {
        let mut forwarded = 0;
        for _ in 0..MAX_BYTES_PER_POLL {
            let byte = match self.source_link(direction).read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => break,
                Err(source) => return Err(ProxyError::Receive { side: direction.source(), source }),
            };

            let sent = self.target_link(direction).send(&[byte]);
            if sent.is_ok() {
                self.stats.direction_mut(direction).bytes_forwarded += 1;
                forwarded += 1;
            }

            self.take_over_header(direction, now);
            if let Some(frame) = self.source_link(direction).feed(byte, now) {
                self.observe(direction, &frame, now);
            }

            sent.map_err(|source| ProxyError::Forward { direction, source })?;
        }
        Ok(forwarded)
    }

    /// Lets `direction` collect the response to a bare header that was
    /// relayed the other way.
    fn take_over_header(&mut self, direction: Direction, now: Instant) {
        if self.source_link(direction).decoder().in_frame() {
            return;
        }
        let Some(id) = self.target_link(direction).decoder_mut().take_header() else { return };
        self.stats.direction_mut(direction.target().outbound()).answered_headers += 1;
        trace!("{direction}: collecting response to header {id}");
        self.source_link(direction).decoder_mut().expect_response(id, now);
    }

    fn observe(&mut self, direction: Direction, frame: &Frame, now: Instant) {
        let decoded = decode_frame(self.profile(), frame);
        let stats = self.stats.direction_mut(direction);
        stats.frames += 1;
        if !decoded.is_recognized() {
            stats.unrecognized_frames += 1;
        }
        debug!("{direction}: frame {} {}", decoded.id, decoded.name());

        let Some(sink) = self.log_sink.as_mut() else { return };
        let elapsed = self.started_at.map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        let line = summarize(elapsed, direction, &decoded, &frame.observed_bytes());
        if let Err(e) = sink.write_line(&line) {
            self.stats.log_failures += 1;
            trace!("log sink: {e}");
        }
    }

    // ── Injection ─────────────────────────────────────────────────────────────

    fn flush_injections(&mut self, now: Instant, errors: &mut Vec<ProxyError>) {
        for side in [Side::Panel, Side::Heater] {
            if !self.quiet(side, now) {
                continue;
            }
            let ModeState::Active(queues) = &mut self.mode else { return };
            let Some(frame) = queues.queue(side).pop_front() else { continue };

            let wire = frame.to_wire();
            let link = match side {
                Side::Panel => &mut self.panel,
                Side::Heater => &mut self.heater,
            };
            match link.send(&wire) {
                Ok(()) => {
                    self.stats.injected_frames += 1;
                    debug!("{side}: injected frame {}", frame.id());
                }
                Err(source) => {
                    self.stats.dropped_injected_bytes += wire.len() as u64;
                    errors.push(ProxyError::Inject { side, source });
                }
            }
        }
    }

    /// `true` when `side` is between frames in both directions.
    fn quiet(&self, side: Side, now: Instant) -> bool {
        let relayed_in = self.link(side.inbound().source()).decoder();
        let own = self.link(side).decoder();
        let gap_elapsed = relayed_in
            .last_byte_at()
            .map_or(true, |t| now.saturating_duration_since(t) >= self.inject_gap);
        !relayed_in.in_frame() && !own.in_frame() && gap_elapsed
    }

    fn drop_injections(&mut self) -> usize {
        let ModeState::Active(queues) = &mut self.mode else { return 0 };
        let dropped = queues.pending_bytes();
        *queues = InjectionQueues::default();
        self.stats.dropped_injected_bytes += dropped as u64;
        dropped
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn profile(&self) -> &'static BusProfile {
        self.panel.decoder().profile()
    }

    fn source_link(&mut self, direction: Direction) -> &mut Link<T> {
        match direction.source() {
            Side::Panel => &mut self.panel,
            Side::Heater => &mut self.heater,
        }
    }

    fn target_link(&mut self, direction: Direction) -> &mut Link<T> {
        match direction.target() {
            Side::Panel => &mut self.panel,
            Side::Heater => &mut self.heater,
        }
    }
}
