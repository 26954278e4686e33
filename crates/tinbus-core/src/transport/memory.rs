//! In-memory transport for tests and simulations.
//!
//! A [`MemoryTransport`] is a cheap handle: clones share the same inbound and
//! outbound queues, so a test can keep one clone while the controller or
//! proxy owns the other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Transport, TransportError};

#[derive(Debug, Default)]
struct Shared {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    fail_writes: bool,
    fail_reads: bool,
    closed: bool,
}

/// A [`Transport`] backed by shared in-memory queues.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `bytes` available to subsequent [`Transport::read_byte`] calls.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// Bytes still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Everything written so far, without clearing it.
    pub fn written(&self) -> Vec<u8> {
        self.lock().outbound.clone()
    }

    /// Everything written so far, clearing the outbound buffer.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().outbound)
    }

    /// While set, every write fails with an I/O error and writes nothing.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// While set, every read fails with an I/O error and consumes nothing.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Simulates the port going away.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panicking test thread must not hide the queue from the others.
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for MemoryTransport {
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let mut shared = self.lock();
        if shared.closed {
            return Err(TransportError::Closed);
        }
        if shared.fail_reads {
            return Err(std::io::Error::other("injected read failure").into());
        }
        Ok(shared.inbound.pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut shared = self.lock();
        if shared.closed {
            return Err(TransportError::Closed);
        }
        if shared.fail_writes {
            return Err(std::io::Error::other("injected write failure").into());
        }
        shared.outbound.extend_from_slice(bytes);
        Ok(())
    }
}
