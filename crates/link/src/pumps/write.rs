//! WebSocket write pump: the only writer of the stream's sink half.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reason carried in the close frame the dashboard sends.
const CLOSE_REASON: &str = "dashboard disconnecting";

/// What one session's write pump put on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WriteSummary {
    pub(crate) pings: u64,
    pub(crate) pongs: u64,
    pub(crate) close_sent: bool,
}

/// Writes queued control frames (keepalive pings, pong replies) to the
/// stream until cancelled or the queue closes.
///
/// Unless the sink already failed, ends the session with a normal close
/// frame so the rover drops us from its broadcast set right away.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut control_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) -> WriteSummary
where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut summary = WriteSummary::default();

    let sink_broken = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break false,
            frame = control_rx.recv() => match frame {
                Some(frame) => frame,
                None => break false,
            },
        };

        let is_ping = frame.is_ping();
        let is_pong = frame.is_pong();
        if let Err(e) = sink.send(frame).await {
            warn!(error = %e, "telemetry stream write failed");
            break true;
        }
        if is_ping {
            summary.pings += 1;
        } else if is_pong {
            summary.pongs += 1;
        }
    };

    if !sink_broken {
        let close = CloseFrame {
            code: CloseCode::Normal,
            reason: CLOSE_REASON.into(),
        };
        match sink.send(tungstenite::Message::Close(Some(close))).await {
            Ok(()) => summary.close_sent = true,
            // Expected when the rover closed first.
            Err(e) => debug!(error = %e, "close frame not sent"),
        }
    }

    summary
}
