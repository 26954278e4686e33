//! Human-readable one-line frame summaries.
//!
//! ```text
//! [1532] heater->panel: 0x16 Info (Status): air_temperature=21.5°C ... | 55 56 82 0B ...
//! [1540] panel->heater: 0x21 unrecognized | 55 E1 01 02 03 04 0A
//! ```

use std::fmt::Write as _;
use std::time::Duration;

use tinbus_core::DecodedFrame;

use super::mode::Direction;

/// Bytes shown in a hex dump before it is cut off with `...`.
pub const HEX_DUMP_LIMIT: usize = 32;

/// Space-separated upper-case hex, at most [`HEX_DUMP_LIMIT`] bytes.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(3 * bytes.len().min(HEX_DUMP_LIMIT) + 3);
    for (i, b) in bytes.iter().take(HEX_DUMP_LIMIT).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02X}");
    }
    if bytes.len() > HEX_DUMP_LIMIT {
        out.push_str(" ...");
    }
    out
}

/// Formats one observed frame.
///
/// `elapsed` is the time since the proxy started; `bytes` are the frame as
/// seen on the wire.
pub fn summarize(
    elapsed: Duration,
    direction: Direction,
    decoded: &DecodedFrame,
    bytes: &[u8],
) -> String {
    let mut line = format!("[{}] {}: {} ", elapsed.as_millis(), direction, decoded.id);
    if decoded.is_recognized() {
        line.push_str(decoded.name());
        line.push(':');
        for update in &decoded.updates {
            let _ = write!(line, " {update}");
        }
        for error in &decoded.rejected {
            let _ = write!(line, " !{error}");
        }
    } else {
        line.push_str("unrecognized");
    }
    let _ = write!(line, " | {}", hex_dump(bytes));
    line
}
