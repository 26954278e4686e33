//! [`Transport`] over a real serial port (feature `serial`).

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

use tracing::debug;

use super::{Transport, TransportError};

/// Bytes pulled from the driver per read call.
const READ_CHUNK: usize = 64;

/// A serial port opened at 8N1 with a zero-wait read policy.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    rx: VecDeque<u8>,
}

impl SerialTransport {
    /// Opens `path` at `baud_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the port cannot be opened.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(1))
            .open()
            .map_err(std::io::Error::from)?;
        debug!("opened serial port {path} at {baud_rate} baud");
        Ok(Self::from_port(port))
    }

    pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self { port, rx: VecDeque::with_capacity(READ_CHUNK) }
    }

    fn fill(&mut self) -> Result<(), TransportError> {
        let available = self.port.bytes_to_read().map_err(std::io::Error::from)? as usize;
        if available == 0 {
            return Ok(());
        }
        let mut chunk = [0u8; READ_CHUNK];
        let want = available.min(READ_CHUNK);
        match self.port.read(&mut chunk[..want]) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => {
                self.rx.extend(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        Ok(self.rx.pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port.flush()?;
        Ok(())
    }
}
