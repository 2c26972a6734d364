use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use rover_protocol::SensorSnapshot;

/// Health of the telemetry push stream.
///
/// The bootstrap read never affects this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Handshake in progress (or not started yet).
    #[default]
    Connecting,
    /// Stream open and delivering frames.
    Live,
    /// Stream lost, transport is retrying.
    Reconnecting,
    /// Retries exhausted or permanent transport failure.
    Failed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Point-in-time copy of the synchronizer state handed to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub snapshot: SensorSnapshot,
    pub status: ConnectionStatus,
    /// When a bootstrap result or telemetry frame was last applied.
    pub last_update: Option<Instant>,
    /// Frames dropped because they could not be decoded.
    pub discarded_frames: u64,
}

impl SyncState {
    /// Whether the readings on screen may be out of date.
    ///
    /// True while the stream is not live, or when nothing has been applied
    /// for longer than `threshold`. Values are never blanked; this only
    /// tells the view to flag them.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        if self.status != ConnectionStatus::Live {
            return true;
        }
        self.last_update.is_none_or(|t| t.elapsed() > threshold)
    }
}
