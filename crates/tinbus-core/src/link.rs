//! A Link: one serial connection plus its own synchronisation state.
//!
//! Links never share buffers.  The decoder here only ever sees bytes that
//! were *received* on this link's transport.

use std::time::Instant;

use crate::protocol::decoder::{FrameDecoder, SyncLoss};
use crate::protocol::frame::Frame;
use crate::transport::{Transport, TransportError};

pub struct Link<T> {
    name: &'static str,
    transport: T,
    decoder: FrameDecoder,
}

impl<T: Transport> Link<T> {
    pub fn new(name: &'static str, transport: T, decoder: FrameDecoder) -> Self {
        Self { name, transport, decoder }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Next pending byte from the transport, without feeding it anywhere.
    pub fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        self.transport.read_byte()
    }

    /// Feeds a byte that was received on this link into its decoder.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Option<Frame> {
        self.decoder.feed(byte, now)
    }

    /// Reads and feeds one byte.  `Ok(None)` means nothing was pending.
    pub fn receive(&mut self, now: Instant) -> Result<Option<(u8, Option<Frame>)>, TransportError> {
        Ok(self.read_byte()?.map(|byte| (byte, self.feed(byte, now))))
    }

    /// Writes and flushes `bytes`.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transport.write_all(bytes)?;
        self.transport.flush()
    }

    pub fn tick(&mut self, now: Instant) -> Option<SyncLoss> {
        self.decoder.tick(now)
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut FrameDecoder {
        &mut self.decoder
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
