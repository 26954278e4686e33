//! One self-delimited unit of TIN bus traffic.
//!
//! Wire format (LIN 1.x style, no explicit terminator):
//! ```text
//! [break:0x00]? [sync:0x55] [pid:1] [data:N] [checksum:1]
//! ```
//! `pid` is the 6-bit frame identifier with two parity bits on top.  `N` is
//! fixed per identifier and comes from the active [`BusProfile`].  The only
//! frame boundary signal on the bus is silence between bytes.
//!
//! [`BusProfile`]: crate::protocol::profile::BusProfile

use std::fmt;

use thiserror::Error;

/// First byte of every header: a UART-level stand-in for the LIN break.
pub const BREAK_BYTE: u8 = 0x00;

/// Synchronisation byte that follows the break.
pub const SYNC_BYTE: u8 = 0x55;

/// Largest data section a LIN frame can carry.
pub const MAX_PAYLOAD_LEN: usize = 8;

/// Errors raised while building or checking a [`Frame`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Identifier does not fit in 6 bits.
    #[error("frame identifier 0x{0:02X} exceeds 0x3F")]
    IdentifierOutOfRange(u8),

    /// Parity bits of a received PID do not match its identifier.
    #[error("protected identifier 0x{0:02X} has bad parity")]
    BadParity(u8),

    /// Payload length differs from what the profile declares for this identifier.
    #[error("frame 0x{id:02X}: payload is {actual} bytes, expected {expected}")]
    LengthMismatch { id: u8, expected: usize, actual: usize },

    /// Checksum byte does not match the payload.
    #[error("frame 0x{id:02X}: checksum 0x{received:02X}, computed 0x{computed:02X}")]
    ChecksumMismatch { id: u8, received: u8, computed: u8 },
}

// ── Identifier ────────────────────────────────────────────────────────────────

/// A 6-bit frame identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u8);

impl FrameId {
    /// Builds an identifier, rejecting values above 0x3F.
    pub const fn new(id: u8) -> Result<Self, FrameError> {
        if id > 0x3F {
            Err(FrameError::IdentifierOutOfRange(id))
        } else {
            Ok(Self(id))
        }
    }

    /// For table literals that are known to be in range.
    pub(crate) const fn from_const(id: u8) -> Self {
        Self(id & 0x3F)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

// ── Parity ────────────────────────────────────────────────────────────────────

/// How the two parity bits on top of a PID are formed.
///
/// Both variants put `P0 = ID0 ^ ID1 ^ ID2 ^ ID4` in bit 6.  They differ in
/// bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityModel {
    /// LIN 1.3 and later: `P1 = !(ID1 ^ ID3 ^ ID4 ^ ID5)`.
    Lin,
    /// TIN panels and heaters: `P1 = ID1 ^ ID3 ^ ID4 ^ ID5`, not inverted.
    Uninverted,
}

impl ParityModel {
    /// Protected identifier: `id` with P0 in bit 6 and P1 in bit 7.
    pub const fn protect(self, id: FrameId) -> u8 {
        let id = id.raw();
        let p0 = (id ^ (id >> 1) ^ (id >> 2) ^ (id >> 4)) & 0x01;
        let p1 = ((id >> 1) ^ (id >> 3) ^ (id >> 4) ^ (id >> 5)) & 0x01;
        let p1 = match self {
            ParityModel::Lin => p1 ^ 0x01,
            ParityModel::Uninverted => p1,
        };
        id | (p0 << 6) | (p1 << 7)
    }

    /// Recovers the identifier from a received PID byte, checking parity.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::BadParity`] if the parity bits are wrong.
    pub const fn unprotect(self, pid: u8) -> Result<FrameId, FrameError> {
        let id = FrameId(pid & 0x3F);
        if self.protect(id) == pid {
            Ok(id)
        } else {
            Err(FrameError::BadParity(pid))
        }
    }
}

// ── Checksum ──────────────────────────────────────────────────────────────────

/// Checksum variant used by a bus profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumModel {
    /// LIN 1.x: inverted sum-with-carry over the data bytes only.
    Classic,
    /// LIN 2.x: as classic, but the protected identifier is summed too.
    Enhanced,
    /// TIN: data bytes added modulo 256, no carry folding, no inversion.
    PlainSum,
}

impl ChecksumModel {
    /// Computes the checksum byte for `payload` sent under protected identifier `pid`.
    pub fn compute(self, pid: u8, payload: &[u8]) -> u8 {
        let seed = match self {
            ChecksumModel::PlainSum => {
                return payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            }
            ChecksumModel::Classic => 0,
            ChecksumModel::Enhanced => u16::from(pid),
        };
        let sum = payload.iter().fold(seed, |acc, &b| {
            let s = acc + u16::from(b);
            if s > 0xFF {
                s - 0xFF
            } else {
                s
            }
        });
        !(sum as u8)
    }
}

// ── Format ────────────────────────────────────────────────────────────────────

/// Parity and checksum rules a bus uses for every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub parity: ParityModel,
    pub checksum: ChecksumModel,
}

impl FrameFormat {
    /// What TIN panels and heaters put on the wire.
    pub const TIN: Self = Self {
        parity: ParityModel::Uninverted,
        checksum: ChecksumModel::PlainSum,
    };

    /// Strict LIN 1.3 framing.
    pub const LIN13: Self = Self {
        parity: ParityModel::Lin,
        checksum: ChecksumModel::Classic,
    };

    pub const fn protect(self, id: FrameId) -> u8 {
        self.parity.protect(id)
    }

    /// # Errors
    ///
    /// Returns [`FrameError::BadParity`] if the parity bits are wrong.
    pub const fn unprotect(self, pid: u8) -> Result<FrameId, FrameError> {
        self.parity.unprotect(pid)
    }

    pub fn checksum_of(self, id: FrameId, payload: &[u8]) -> u8 {
        self.checksum.compute(self.protect(id), payload)
    }

    /// A header without a response: break, sync and PID.
    ///
    /// The bus master sends this to ask the slave owning `id` for its data.
    pub const fn header(self, id: FrameId) -> [u8; 3] {
        [BREAK_BYTE, SYNC_BYTE, self.protect(id)]
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// A complete frame: identifier, payload and checksum.
///
/// Frames are ephemeral.  They are produced by the decoder or the encoder,
/// consumed once, and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: FrameId,
    pid: u8,
    payload: Vec<u8>,
    checksum: u8,
}

impl Frame {
    /// Builds an outbound frame, computing its PID and checksum.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::LengthMismatch`] when the payload is empty or
    /// longer than [`MAX_PAYLOAD_LEN`].
    pub fn new(id: FrameId, payload: Vec<u8>, format: FrameFormat) -> Result<Self, FrameError> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::LengthMismatch {
                id: id.raw(),
                expected: payload.len().clamp(1, MAX_PAYLOAD_LEN),
                actual: payload.len(),
            });
        }
        let checksum = format.checksum_of(id, &payload);
        Ok(Self { id, pid: format.protect(id), payload, checksum })
    }

    /// Wraps received bytes, accepting them only if the checksum is consistent.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ChecksumMismatch`] on a bad checksum byte.
    pub fn from_received(
        id: FrameId,
        payload: Vec<u8>,
        checksum: u8,
        format: FrameFormat,
    ) -> Result<Self, FrameError> {
        let computed = format.checksum_of(id, &payload);
        if computed != checksum {
            return Err(FrameError::ChecksumMismatch {
                id: id.raw(),
                received: checksum,
                computed,
            });
        }
        Ok(Self { id, pid: format.protect(id), payload, checksum })
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Protected identifier as it appears on the wire.
    pub fn pid(&self) -> u8 {
        self.pid
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Serialises the frame for transmission, including break and sync.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.payload.len());
        buf.extend_from_slice(&[BREAK_BYTE, SYNC_BYTE, self.pid]);
        buf.extend_from_slice(&self.payload);
        buf.push(self.checksum);
        buf
    }

    /// Bytes as seen on the bus after the break: sync, PID, data, checksum.
    pub fn observed_bytes(&self) -> Vec<u8> {
        let mut wire = self.to_wire();
        wire.remove(0);
        wire
    }

    /// Data and checksum only: what a slave sends after someone else's header.
    pub fn response_bytes(&self) -> Vec<u8> {
        let mut buf = self.payload.clone();
        buf.push(self.checksum);
        buf
    }
}
