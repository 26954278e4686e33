//! [`LogSink`] implementations.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::config::{LogSinkKind, ProxyConfig};
use crate::domain::{LogSink, LogSinkError};

/// Emits each summary as an event on target `tinbus::frames`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write_line(&mut self, line: &str) -> Result<(), LogSinkError> {
        info!(target: "tinbus::frames", "{line}");
        Ok(())
    }
}

/// Keeps only the most recent summary, like a text sensor would.
///
/// Clones share the same slot, so one clone can be handed to the proxy while
/// another is read from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct LastLineSink {
    latest: Arc<Mutex<Option<String>>>,
}

impl LastLineSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for LastLineSink {
    fn write_line(&mut self, line: &str) -> Result<(), LogSinkError> {
        *self.lock() = Some(line.to_string());
        Ok(())
    }
}

/// The sink the configuration asks for, or `None` when logging is off.
///
/// For [`LogSinkKind::LastLine`] the returned sink writes into `last_line`,
/// so the caller keeps a reader for the same slot.
pub fn build_log_sink(config: &ProxyConfig, last_line: &LastLineSink) -> Option<Box<dyn LogSink>> {
    if !config.logging_enabled {
        return None;
    }
    match config.log_sink {
        LogSinkKind::Tracing => Some(Box::new(TracingLogSink)),
        LogSinkKind::LastLine => Some(Box::new(last_line.clone())),
        LogSinkKind::None => None,
    }
}
