//! The byte I/O seam between the protocol core and a serial port.
//!
//! The core only needs two primitives per Link: "give me the next byte if one
//! is already here" and "write these bytes".  Neither may block waiting for
//! bus input, because idle detection depends on the caller's clock.
//!
//! # Testability
//!
//! [`MemoryTransport`] implements the trait over in-memory queues so the
//! heater controller and the proxy can be exercised without hardware.

use thiserror::Error;

pub mod memory;
#[cfg(feature = "serial")]
pub mod serial;

pub use memory::MemoryTransport;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;

/// Errors raised by a [`Transport`].
///
/// These are reported to the embedding system; they never touch decoder state.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport closed")]
    Closed,
}

/// Non-blocking byte access to one serial link.
pub trait Transport: Send {
    /// Returns the next received byte, or `None` if nothing is pending.
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError>;

    /// Queues `bytes` for transmission.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Pushes queued bytes to the wire.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }
}
