//! Wire-level protocol: frame model, bus profile, frame synchronisation and
//! the field codec.

pub mod codec;
pub mod decoder;
pub mod frame;
pub mod profile;

pub use codec::{decode_frame, encode_command, fuel_mode_of, status_request, DecodedFrame};
pub use decoder::{DecoderStats, FrameDecoder, SyncLoss, DEFAULT_IDLE_TIMEOUT};
pub use frame::{
    ChecksumModel, Frame, FrameError, FrameFormat, FrameId, ParityModel, BREAK_BYTE, SYNC_BYTE,
};
pub use profile::{profile_by_name, BusProfile, FrameKind, FrameLayout, LIN13_PROFILE, TIN_PROFILE};
