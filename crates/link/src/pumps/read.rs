//! WebSocket read pump: forwards inbound frames to the state owner.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use rover_protocol::constants::WS_MAX_MESSAGE_SIZE;

use crate::types::SyncEvent;

/// Why the read pump stopped.
#[derive(Debug, PartialEq)]
pub(crate) enum ReadExit {
    /// Cancellation requested, or nobody is listening for events anymore.
    Cancelled,
    /// The rover sent a close frame or ended the stream.
    Closed,
    /// Read error or read deadline expired.
    Broken(String),
}

/// Reads frames from the WebSocket and forwards text frames as
/// [`SyncEvent::Frame`], preserving arrival order.
///
/// Any inbound frame resets the read deadline; if nothing arrives within
/// `deadline` the link is considered dead.
pub(crate) async fn read_pump<S>(
    mut read: S,
    events: &mpsc::Sender<SyncEvent>,
    write_tx: &mpsc::Sender<tungstenite::Message>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> ReadExit
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let read_deadline = tokio::time::sleep(deadline);
    tokio::pin!(read_deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ReadExit::Cancelled,

            () = &mut read_deadline => {
                warn!(deadline_secs = deadline.as_secs(), "telemetry stream silent, closing");
                return ReadExit::Broken("read deadline expired".into());
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("telemetry stream read error: {e}");
                        return ReadExit::Broken(e.to_string());
                    }
                    None => {
                        debug!("telemetry stream ended");
                        return ReadExit::Closed;
                    }
                };

                read_deadline.as_mut().reset(tokio::time::Instant::now() + deadline);

                match msg {
                    tungstenite::Message::Text(text) => {
                        let event = if text.len() > WS_MAX_MESSAGE_SIZE {
                            warn!("frame too large ({} bytes), dropping", text.len());
                            SyncEvent::Oversized(text.len())
                        } else {
                            SyncEvent::Frame(text.as_str().to_owned())
                        };
                        if events.send(event).await.is_err() {
                            return ReadExit::Cancelled;
                        }
                    }
                    tungstenite::Message::Ping(data) => {
                        trace!("received ping, sending pong");
                        let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    }
                    tungstenite::Message::Pong(_) => {
                        trace!("received pong");
                    }
                    tungstenite::Message::Close(frame) => {
                        debug!(frame = ?frame, "received close frame");
                        return ReadExit::Closed;
                    }
                    tungstenite::Message::Binary(data) => {
                        trace!(bytes = data.len(), "ignoring binary frame");
                    }
                    tungstenite::Message::Frame(_) => {}
                }
            }
        }
    }
}
