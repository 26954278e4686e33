//! Application layer: the relay itself.

pub mod proxy;

pub use proxy::{
    BusProxy, DirectionStats, ProxyError, ProxySettings, ProxyStats, DEFAULT_INJECT_GAP,
    MAX_BYTES_PER_POLL,
};
