//! Telemetry stream transport with exponential-backoff reconnection.
//!
//! Owns the WebSocket for its whole life: connects, runs the read, write
//! and ping pumps for one session, and on loss retries until the retry
//! budget runs out. Everything observable is reported as [`SyncEvent`]s.

use futures_util::{FutureExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rover_protocol::constants::WS_PING_PERIOD;

use crate::pumps::ping::ping_pump;
use crate::pumps::read::{ReadExit, read_pump};
use crate::pumps::write::{WriteSummary, write_pump};
use crate::types::{SyncConfig, SyncEvent};

/// Connection failures that no amount of retrying will fix.
fn is_permanent(err: &tungstenite::Error) -> bool {
    match err {
        tungstenite::Error::Url(_) => true,
        tungstenite::Error::Http(resp) => {
            let status = resp.status();
            status.is_client_error()
                && status != tungstenite::http::StatusCode::REQUEST_TIMEOUT
                && status != tungstenite::http::StatusCode::TOO_MANY_REQUESTS
        }
        _ => false,
    }
}

/// Runs the stream until cancelled or until reconnection gives up.
pub(crate) async fn run(
    url: Url,
    config: SyncConfig,
    events: mpsc::Sender<SyncEvent>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            r = tokio_tungstenite::connect_async(url.as_str()) => r,
        };

        match connected {
            Ok((ws, _)) => {
                attempt = 0;
                info!(url = %url, "telemetry stream open");
                if events.send(SyncEvent::Opened).await.is_err() {
                    return;
                }

                let event = match session(ws, &events, &config, &cancel).await {
                    ReadExit::Cancelled => return,
                    ReadExit::Closed => {
                        info!(url = %url, "telemetry stream closed by rover");
                        SyncEvent::Closed
                    }
                    ReadExit::Broken(reason) => {
                        warn!(url = %url, reason = %reason, "telemetry stream lost");
                        SyncEvent::Errored
                    }
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }
            Err(e) if is_permanent(&e) => {
                warn!(url = %url, error = %e, "telemetry stream cannot be opened, giving up");
                let _ = events.send(SyncEvent::Failed).await;
                return;
            }
            Err(e) => {
                warn!(url = %url, attempt, error = %e, "telemetry stream connect failed");
                if events.send(SyncEvent::Errored).await.is_err() {
                    return;
                }
            }
        }

        attempt = attempt.saturating_add(1);
        if config.reconnect.exhausted(attempt) {
            info!(url = %url, attempts = attempt - 1, "reconnect budget exhausted");
            let _ = events.send(SyncEvent::Failed).await;
            return;
        }

        let delay = config.reconnect.delay_for_attempt(attempt);
        let delay_secs = delay.as_secs_f64();
        info!(
            url = %url,
            attempt,
            delay_secs = format_args!("{delay_secs:.1}"),
            "reconnecting telemetry stream"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("reconnect cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Result of a pump task within one session.
enum PumpReport {
    Writer(WriteSummary),
    Pinger(u64),
}

/// Drives one connected session until it ends.
///
/// The write and ping pumps live in a [`JoinSet`], so they are aborted
/// together with this future if the owning task is torn down.
async fn session<S>(
    ws: S,
    events: &mpsc::Sender<SyncEvent>,
    config: &SyncConfig,
    cancel: &CancellationToken,
) -> ReadExit
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>>
        + futures_util::Sink<tungstenite::Message, Error = tungstenite::Error>
        + Send
        + 'static,
{
    let (write, read) = ws.split();
    let (control_tx, control_rx) = mpsc::channel::<tungstenite::Message>(32);
    let session_cancel = cancel.child_token();

    let mut pumps = JoinSet::new();
    pumps.spawn(
        write_pump(write, control_rx, session_cancel.clone()).map(PumpReport::Writer),
    );
    pumps.spawn(
        ping_pump(control_tx.clone(), WS_PING_PERIOD, session_cancel.clone())
            .map(PumpReport::Pinger),
    );

    let exit = read_pump(read, events, &control_tx, config.read_deadline, &session_cancel).await;

    // Let the write pump flush its close frame.
    session_cancel.cancel();
    drop(control_tx);

    let mut written = WriteSummary::default();
    let mut pings_queued = 0;
    while let Some(done) = pumps.join_next().await {
        match done {
            Ok(PumpReport::Writer(summary)) => written = summary,
            Ok(PumpReport::Pinger(n)) => pings_queued = n,
            Err(e) => warn!(error = %e, "session pump failed"),
        }
    }
    debug!(
        exit = ?exit,
        pings_queued,
        pings_written = written.pings,
        pongs_written = written.pongs,
        close_sent = written.close_sent,
        "telemetry session finished"
    );

    exit
}
