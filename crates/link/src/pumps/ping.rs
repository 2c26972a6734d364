//! WebSocket ping pump: numbered keepalive pings.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Queues a ping every `period` so idle proxies keep the stream open and
/// the rover's replies keep the read deadline fresh.
///
/// Each ping carries its sequence number (big-endian `u64`) as payload.
/// Returns how many pings were queued.
pub(crate) async fn ping_pump(
    control_tx: mpsc::Sender<tungstenite::Message>,
    period: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // First tick is immediate.

    let mut sent: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let seq = sent + 1;
                let ping = tungstenite::Message::Ping(seq.to_be_bytes().to_vec().into());
                if control_tx.send(ping).await.is_err() {
                    break;
                }
                sent = seq;
                trace!(seq, "keepalive ping queued");
            }
        }
    }
    sent
}
