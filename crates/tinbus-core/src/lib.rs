//! # tinbus-core
//!
//! Shared library for the TIN bus heater tools, containing the frame model,
//! the bus profile table, frame synchronisation, the field codec and the byte
//! transport seam.
//!
//! This crate is used by both the standalone heater controller and the
//! dual-link proxy.  It has no dependency on async runtimes; the only OS API
//! it touches is the serial port, behind the `serial` feature.
//!
//! # Architecture overview
//!
//! The heater and its control panel talk over a single-wire serial bus in
//! LIN 1.x style frames.  Nothing on the wire marks where a frame ends except
//! the length implied by its identifier, and silence between frames.
//!
//! - **`domain`** – What the bus carries, without bytes: [`Field`]s,
//!   [`Temperature`]s, option-list [`Level`]s and outbound [`Command`]s.
//!
//! - **`protocol`** – How the bytes look.  [`FrameDecoder`] turns a byte
//!   stream into checksummed [`Frame`]s, [`decode_frame`] turns a frame into
//!   [`FieldUpdate`]s, and [`encode_command`] goes the other way.  All layout
//!   facts live in a [`BusProfile`] ([`TIN_PROFILE`] by default).
//!
//! - **`transport`** – The non-blocking byte I/O a [`Link`] is built on.

pub mod domain;
pub mod link;
pub mod protocol;
pub mod transport;

pub use domain::{
    Command, CommandError, Field, FieldError, FieldUpdate, FieldValue, FuelMode, Level,
    SelectField, StatusCode, SwitchField, Temperature,
};
pub use link::Link;
pub use protocol::{
    decode_frame, encode_command, profile_by_name, status_request, BusProfile, DecodedFrame,
    DecoderStats, Frame, FrameDecoder, FrameError, FrameFormat, FrameId, FrameKind, SyncLoss,
    DEFAULT_IDLE_TIMEOUT, LIN13_PROFILE, TIN_PROFILE,
};
pub use transport::{MemoryTransport, Transport, TransportError};
