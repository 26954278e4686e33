//! Async drivers around the synchronous controller.
//!
//! The controller itself never awaits.  The runtime only decides *when* to
//! poll (a fixed `tokio::time::interval`) and *when* to stop (any future, in
//! practice Ctrl+C).  Control requests from stdin go through the same
//! [`ControlHandle`] any other control surface would use.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use tinbus_core::{Transport, TransportError};

use crate::application::{ControlHandle, HeaterController};
use crate::domain::ControlRequest;

/// Polls `controller` every `poll_interval` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`TransportError::Closed`] if the port goes away.  Other transport
/// errors are logged and polling continues.
pub async fn run_controller<T, F>(
    mut controller: HeaterController<T>,
    poll_interval: Duration,
    shutdown: F,
) -> Result<HeaterController<T>, TransportError>
where
    T: Transport,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                return Ok(controller);
            }
            _ = ticker.tick() => {
                match controller.poll(Instant::now()) {
                    Ok(_) => {}
                    Err(TransportError::Closed) => return Err(TransportError::Closed),
                    Err(e) => warn!("transport error: {e}"),
                }
            }
        }
    }
}

/// Reads control requests line by line and submits them until EOF.
///
/// Returns the number of requests accepted.
pub async fn read_requests<R>(reader: R, control: ControlHandle) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut accepted = 0;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("control input failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let result = line
            .parse::<ControlRequest>()
            .map_err(Into::into)
            .and_then(|request| control.submit(request));
        match result {
            Ok(()) => accepted += 1,
            Err(e) => warn!("{}: {e}", line.trim()),
        }
    }
    accepted
}
