//! Domain layer for tinbus-proxy.
//!
//! Pure types: which side is which, the proxy's mode and lifecycle, the log
//! sink seam and the summary line format.  No I/O.

pub mod log_sink;
pub mod mode;
pub mod summary;

pub use log_sink::{LogSink, LogSinkError};
pub use mode::{Direction, InjectRequest, ProxyMode, ProxyRequest, ProxyState, Side};
pub use summary::{hex_dump, summarize, HEX_DUMP_LIMIT};
