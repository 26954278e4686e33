//! Async drivers around the synchronous proxy.
//!
//! The proxy never awaits.  The runtime decides when to poll, applies
//! requests that arrive on the channel between polls, and stops the proxy
//! once `shutdown` resolves.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use tinbus_core::Transport;

use crate::application::{BusProxy, ProxyError};
use crate::domain::ProxyRequest;

/// Starts `proxy` and polls it every `poll_interval` until `shutdown`
/// resolves, then stops it.
///
/// # Errors
///
/// Returns the [`ProxyError`] if either port closes.  Other transport
/// errors are logged and relaying continues.
pub async fn run_proxy<T, F>(
    mut proxy: BusProxy<T>,
    poll_interval: Duration,
    mut requests: mpsc::Receiver<ProxyRequest>,
    shutdown: F,
) -> Result<BusProxy<T>, ProxyError>
where
    T: Transport,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut requests_open = true;

    proxy.start(Instant::now());
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                proxy.stop();
                return Ok(proxy);
            }
            request = requests.recv(), if requests_open => match request {
                Some(request) => apply(&mut proxy, request),
                None => requests_open = false,
            },
            _ = ticker.tick() => {
                match proxy.poll(Instant::now()) {
                    Ok(_) => {}
                    Err(e) if e.is_closed() => {
                        proxy.stop();
                        return Err(e);
                    }
                    Err(e) => warn!("{e}"),
                }
            }
        }
    }
}

fn apply<T: Transport>(proxy: &mut BusProxy<T>, request: ProxyRequest) {
    match request {
        ProxyRequest::SetMode(mode) => proxy.set_mode(mode),
        ProxyRequest::Inject(inject) => match proxy.originate(inject.target, &inject.command) {
            Ok(true) => {}
            Ok(false) => {
                warn!("{} for {} ignored in {} mode", inject.command, inject.target, proxy.mode());
            }
            Err(e) => warn!("{} for {} rejected: {e}", inject.command, inject.target),
        },
    }
}

/// Reads proxy requests line by line and forwards them until EOF or until
/// the proxy side of the channel is gone.
///
/// Returns the number of requests forwarded.
pub async fn read_proxy_requests<R>(reader: R, tx: mpsc::Sender<ProxyRequest>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
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
        match line.parse::<ProxyRequest>() {
            Ok(request) => {
                if tx.send(request).await.is_err() {
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!("{}: {e}", line.trim()),
        }
    }
    forwarded
}
