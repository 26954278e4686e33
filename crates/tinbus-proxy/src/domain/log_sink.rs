//! Where frame summaries go.
//!
//! A log sink is fire-and-forget: the proxy hands it one line per observed
//! frame and ignores the outcome apart from counting failures.  Having no
//! sink at all is the same as logging being off.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("log sink unavailable: {0}")]
    Unavailable(String),
}

#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send {
    fn write_line(&mut self, line: &str) -> Result<(), LogSinkError>;
}
