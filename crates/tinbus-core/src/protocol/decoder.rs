//! Byte-at-a-time frame synchronisation for one Link.
//!
//! The TIN bus has no delimiter.  A frame starts with the sync byte, the next
//! byte names the identifier (and therefore the payload length), and the frame
//! ends after exactly that many data bytes plus the checksum.  The only
//! recovery signal is silence: if the gap since the previous byte exceeds the
//! idle threshold, whatever partial frame was buffered is dropped.
//!
//! ```text
//!   Hunting ──0x55──▶ Identifier ──valid PID──▶ Collecting(len)
//!      ▲                   │ bad parity              │ len + 1 bytes
//!      └───────────────────┴─────────────────────────┘ (frame or checksum drop)
//! ```
//!
//! The decoder never blocks or reads a clock.  The caller passes `now` with
//! every byte, and calls [`FrameDecoder::tick`] while the bus is silent.
//!
//! A master header and the slave's response can arrive on different links.
//! [`FrameDecoder::take_header`] ends a bare header on one decoder and
//! [`FrameDecoder::expect_response`] makes another collect the response.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::frame::{Frame, FrameId, SYNC_BYTE};
use super::profile::{BusProfile, TIN_PROFILE};

/// Silence longer than this ends (and discards) any partial frame.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Diagnostic counters.  None of these are surfaced as errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames that passed the checksum.
    pub frames: u64,
    /// Frames dropped because the checksum did not match.
    pub checksum_errors: u64,
    /// Partial frames dropped because of an idle gap.
    pub sync_losses: u64,
    /// Headers dropped because the PID parity was wrong.
    pub parity_errors: u64,
    /// Bytes seen while hunting for a sync byte (breaks, noise).
    pub skipped_bytes: u64,
    /// Bare headers whose response was collected by another decoder.
    pub handed_off_headers: u64,
}

/// Reported by [`FrameDecoder::tick`] when a partial frame timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLoss {
    /// Bytes of the partial frame that were thrown away (sync byte included).
    pub discarded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Hunting,
    Identifier,
    Collecting { id: FrameId, len: usize },
}

/// Frame synchroniser and accumulator for one direction of one Link.
#[derive(Debug)]
pub struct FrameDecoder {
    profile: &'static BusProfile,
    idle_timeout: Duration,
    state: SyncState,
    /// Data bytes followed by the checksum byte of the frame in progress.
    buf: Vec<u8>,
    last_byte_at: Option<Instant>,
    stats: DecoderStats,
}

impl FrameDecoder {
    pub fn new(profile: &'static BusProfile, idle_timeout: Duration) -> Self {
        Self {
            profile,
            idle_timeout,
            state: SyncState::Hunting,
            buf: Vec::with_capacity(super::frame::MAX_PAYLOAD_LEN + 1),
            last_byte_at: None,
            stats: DecoderStats::default(),
        }
    }

    /// Feeds one received byte.  Returns a frame when this byte completed one
    /// with a valid checksum.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Option<Frame> {
        if self.in_frame() && self.idle_expired(now) {
            self.lose_sync();
        }
        self.last_byte_at = Some(now);

        match self.state {
            SyncState::Hunting => {
                if byte == SYNC_BYTE {
                    self.state = SyncState::Identifier;
                } else {
                    self.stats.skipped_bytes += 1;
                }
                None
            }
            SyncState::Identifier => {
                match self.profile.format.unprotect(byte) {
                    Ok(id) => {
                        let len = self.profile.payload_len(id);
                        self.buf.clear();
                        self.state = SyncState::Collecting { id, len };
                    }
                    Err(e) => {
                        trace!("{e}; resynchronising");
                        self.stats.parity_errors += 1;
                        self.state = SyncState::Hunting;
                    }
                }
                None
            }
            SyncState::Collecting { id, len } => {
                self.buf.push(byte);
                if self.buf.len() <= len {
                    return None;
                }
                self.complete(id)
            }
        }
    }

    /// Evaluates the idle threshold while no bytes arrive.
    pub fn tick(&mut self, now: Instant) -> Option<SyncLoss> {
        if self.in_frame() && self.idle_expired(now) {
            Some(self.lose_sync())
        } else {
            None
        }
    }

    /// Drops any partial frame without counting it as a synchronisation loss.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = SyncState::Hunting;
        self.last_byte_at = None;
    }

    /// Identifier of a header that has not received any response byte yet.
    pub fn pending_header(&self) -> Option<FrameId> {
        match self.state {
            SyncState::Collecting { id, .. } if self.buf.is_empty() => Some(id),
            _ => None,
        }
    }

    /// Ends a bare header without counting a synchronisation loss and
    /// returns its identifier.  `None` if no bare header is pending.
    pub fn take_header(&mut self) -> Option<FrameId> {
        let id = self.pending_header()?;
        trace!("header {id} answered elsewhere");
        self.state = SyncState::Hunting;
        self.stats.handed_off_headers += 1;
        Some(id)
    }

    /// Treats the next byte as the first data byte of `id`, as if this
    /// decoder had seen the header itself.  A partial frame is discarded.
    pub fn expect_response(&mut self, id: FrameId, now: Instant) {
        let len = self.profile.payload_len(id);
        self.buf.clear();
        self.state = SyncState::Collecting { id, len };
        self.last_byte_at = Some(now);
    }

    /// `true` once a sync byte was seen and the frame is not finished yet.
    pub fn in_frame(&self) -> bool {
        self.state != SyncState::Hunting
    }

    /// Bytes of the frame in progress, counting from the sync byte.
    pub fn buffered(&self) -> usize {
        match self.state {
            SyncState::Hunting => 0,
            SyncState::Identifier => 1,
            SyncState::Collecting { .. } => 2 + self.buf.len(),
        }
    }

    pub fn last_byte_at(&self) -> Option<Instant> {
        self.last_byte_at
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn profile(&self) -> &'static BusProfile {
        self.profile
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn idle_expired(&self, now: Instant) -> bool {
        self.last_byte_at
            .is_some_and(|last| now.saturating_duration_since(last) > self.idle_timeout)
    }

    fn lose_sync(&mut self) -> SyncLoss {
        let loss = SyncLoss { discarded: self.buffered() };
        debug!("idle gap: discarding {} byte partial frame", loss.discarded);
        self.stats.sync_losses += 1;
        self.buf.clear();
        self.state = SyncState::Hunting;
        loss
    }

    fn complete(&mut self, id: FrameId) -> Option<Frame> {
        self.state = SyncState::Hunting;
        let checksum = self.buf.pop()?;
        let payload = std::mem::take(&mut self.buf);
        self.buf.reserve(super::frame::MAX_PAYLOAD_LEN + 1);

        match Frame::from_received(id, payload, checksum, self.profile.format) {
            Ok(frame) => {
                self.stats.frames += 1;
                Some(frame)
            }
            Err(e) => {
                debug!("dropping frame: {e}");
                self.stats.checksum_errors += 1;
                None
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(&TIN_PROFILE, DEFAULT_IDLE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::BREAK_BYTE;

    fn vent_frame(level: u8) -> Frame {
        Frame::new(FrameId::new(0x07).unwrap(), vec![level], TIN_PROFILE.format).unwrap()
    }

    fn pid(raw: u8) -> u8 {
        TIN_PROFILE.format.protect(FrameId::new(raw).unwrap())
    }

    fn feed_all(dec: &mut FrameDecoder, bytes: &[u8], now: Instant) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| dec.feed(b, now)).collect()
    }

    #[test]
    fn test_feed_emits_frame_on_last_byte_only() {
        // Arrange
        let mut dec = FrameDecoder::default();
        let wire = vent_frame(3).to_wire();
        let now = Instant::now();

        // Act
        let results: Vec<Option<Frame>> = wire.iter().map(|&b| dec.feed(b, now)).collect();

        // Assert
        assert!(results[..wire.len() - 1].iter().all(Option::is_none));
        assert_eq!(results.last().unwrap().as_ref(), Some(&vent_frame(3)));
        assert_eq!(dec.buffered(), 0);
        assert_eq!(dec.stats().frames, 1);
    }

    #[test]
    fn test_break_byte_is_skipped_while_hunting() {
        let mut dec = FrameDecoder::default();
        dec.feed(BREAK_BYTE, Instant::now());
        assert!(!dec.in_frame());
        assert_eq!(dec.stats().skipped_bytes, 1);
    }

    #[test]
    fn test_bad_checksum_is_dropped_and_buffer_cleared() {
        let mut dec = FrameDecoder::default();
        let mut wire = vent_frame(3).to_wire();
        *wire.last_mut().unwrap() ^= 0x01;

        let frames = feed_all(&mut dec, &wire, Instant::now());

        assert!(frames.is_empty());
        assert_eq!(dec.buffered(), 0);
        assert_eq!(dec.stats().checksum_errors, 1);
    }

    #[test]
    fn test_bad_parity_returns_to_hunting() {
        let mut dec = FrameDecoder::default();
        let now = Instant::now();
        dec.feed(SYNC_BYTE, now);
        dec.feed(pid(0x07) ^ 0x40, now);
        assert!(!dec.in_frame());
        assert_eq!(dec.stats().parity_errors, 1);
    }

    #[test]
    fn test_idle_gap_discards_partial_frame_on_next_byte() {
        // Arrange: the first three bytes of an info frame, then a long pause.
        let mut dec = FrameDecoder::default();
        let t0 = Instant::now();
        feed_all(&mut dec, &[SYNC_BYTE, pid(0x16), 0x01], t0);
        assert_eq!(dec.buffered(), 3);

        // Act: a complete vent frame after the gap.
        let later = t0 + DEFAULT_IDLE_TIMEOUT + Duration::from_millis(1);
        let frames = feed_all(&mut dec, &vent_frame(2).to_wire(), later);

        // Assert
        assert_eq!(frames, vec![vent_frame(2)]);
        assert_eq!(dec.stats().sync_losses, 1);
    }

    #[test]
    fn test_tick_reports_sync_loss_once() {
        let mut dec = FrameDecoder::default();
        let t0 = Instant::now();
        feed_all(&mut dec, &[SYNC_BYTE], t0);

        assert_eq!(dec.tick(t0 + Duration::from_millis(50)), None);
        let late = t0 + DEFAULT_IDLE_TIMEOUT * 2;
        assert_eq!(dec.tick(late), Some(SyncLoss { discarded: 1 }));
        assert_eq!(dec.tick(late), None);
        assert_eq!(dec.buffered(), 0);
    }

    #[test]
    fn test_gap_exactly_at_threshold_keeps_frame() {
        let mut dec = FrameDecoder::default();
        let t0 = Instant::now();
        let wire = vent_frame(5).to_wire();
        let (head, tail) = wire.split_at(3);
        feed_all(&mut dec, head, t0);
        let frames = feed_all(&mut dec, tail, t0 + DEFAULT_IDLE_TIMEOUT);
        assert_eq!(frames, vec![vent_frame(5)]);
    }

    #[test]
    fn test_reset_clears_partial_frame_without_counting_loss() {
        let mut dec = FrameDecoder::default();
        feed_all(&mut dec, &[SYNC_BYTE], Instant::now());
        dec.reset();
        assert!(!dec.in_frame());
        assert_eq!(dec.last_byte_at(), None);
        assert_eq!(dec.stats().sync_losses, 0);
    }

    #[test]
    fn test_decodes_vent_frame_sent_by_a_tin_panel() {
        let mut dec = FrameDecoder::default();
        let frames = feed_all(&mut dec, &[0x00, 0x55, 0xC7, 0x03, 0x03], Instant::now());
        assert_eq!(frames, vec![vent_frame(3)]);
        assert_eq!(dec.stats().parity_errors, 0);
    }

    #[test]
    fn test_take_header_only_when_no_response_byte_arrived() {
        let mut dec = FrameDecoder::default();
        let now = Instant::now();
        feed_all(&mut dec, &[BREAK_BYTE, SYNC_BYTE, pid(0x16)], now);
        assert_eq!(dec.pending_header(), Some(FrameId::new(0x16).unwrap()));

        assert_eq!(dec.take_header(), Some(FrameId::new(0x16).unwrap()));

        assert!(!dec.in_frame());
        assert_eq!(dec.take_header(), None);
        assert_eq!(dec.stats().handed_off_headers, 1);
        assert_eq!(dec.stats().sync_losses, 0);

        feed_all(&mut dec, &[SYNC_BYTE, pid(0x07), 0x03], now);
        assert_eq!(dec.pending_header(), None);
    }

    #[test]
    fn test_expect_response_collects_data_without_a_header() {
        // Arrange: the header went out on another link.
        let mut dec = FrameDecoder::default();
        let now = Instant::now();
        let response = vent_frame(4).response_bytes();

        // Act
        dec.expect_response(FrameId::new(0x07).unwrap(), now);
        let frames = feed_all(&mut dec, &response, now);

        // Assert
        assert_eq!(frames, vec![vent_frame(4)]);
        assert!(!dec.in_frame());
    }
}
