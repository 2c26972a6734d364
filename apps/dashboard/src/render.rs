//! Text rendering of the synchronized state.

use std::fmt::Write as _;
use std::time::Duration;

use serde_json::Value;

use rover_link::{ConnectionStatus, SyncState};

/// Renders one dashboard frame: status line, then each sensor panel.
pub fn render(state: &SyncState, stale_after: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", status_line(state, stale_after));
    panel(&mut out, "IMU", state.snapshot.imu.as_ref());
    panel(&mut out, "Barometer", state.snapshot.barometer.as_ref());
    out
}

/// One-line summary of the connection and data freshness.
pub fn status_line(state: &SyncState, stale_after: Duration) -> String {
    let mut line = format!("[{}]", status_label(state.status));

    match state.last_update {
        Some(at) => {
            let _ = write!(line, " updated {:.1}s ago", at.elapsed().as_secs_f64());
        }
        None => line.push_str(" no readings yet"),
    }
    if state.status == ConnectionStatus::Live && state.is_stale(stale_after) {
        line.push_str(" (stale)");
    }
    if state.discarded_frames > 0 {
        let _ = write!(line, ", {} malformed frames dropped", state.discarded_frames);
    }
    line
}

fn status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connecting => "connecting",
        ConnectionStatus::Live => "live",
        ConnectionStatus::Reconnecting => "reconnecting",
        ConnectionStatus::Failed => "offline",
    }
}

fn panel(out: &mut String, title: &str, value: Option<&Value>) {
    let _ = writeln!(out, "{title}:");
    match value.map(serde_json::to_string_pretty) {
        Some(Ok(json)) => {
            let _ = writeln!(out, "{json}");
        }
        Some(Err(_)) | None => out.push_str("no data\n"),
    }
}
