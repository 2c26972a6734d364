use std::time::Instant;

use serde_json::Value;
use tracing::{debug, trace};

use rover_protocol::{DecodeError, SensorSnapshot, StreamMessage};

use crate::status::{ConnectionStatus, SyncState};

/// What happened to a single inbound stream frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Telemetry merged into the snapshot; observers must be notified.
    Applied,
    /// Valid envelope of a kind this layer does not act on.
    Ignored(String),
    /// Frame could not be decoded and was dropped.
    Discarded(DecodeError),
}

impl FrameOutcome {
    /// Whether the frame produced a state-changed notification.
    pub fn notifies(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Fields that have been written by the stream at least once.
#[derive(Debug, Clone, Copy, Default)]
struct StreamedFields {
    imu: bool,
    barometer: bool,
}

/// Merged sensor state plus stream health.
///
/// Every mutating method returns whether observers should be notified.
/// No method ever clears a known reading: updates are partial merges and
/// disconnects only change the status.
#[derive(Debug, Clone, Default)]
pub struct TelemetryState {
    snapshot: SensorSnapshot,
    status: ConnectionStatus,
    last_update: Option<Instant>,
    streamed: StreamedFields,
    discarded_frames: u64,
}

impl TelemetryState {
    /// Create an empty state: no readings, status `Connecting`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the bootstrap read.
    ///
    /// The stream is authoritative: a field already delivered by the stream
    /// is kept even if the bootstrap response arrives later.
    pub fn on_bootstrap(&mut self, snapshot: SensorSnapshot) -> bool {
        let imu = if self.streamed.imu { None } else { snapshot.imu };
        let barometer = if self.streamed.barometer {
            None
        } else {
            snapshot.barometer
        };

        let changed = merge_field(&mut self.snapshot.imu, imu)
            | merge_field(&mut self.snapshot.barometer, barometer);
        if changed {
            self.last_update = Some(Instant::now());
        }
        changed
    }

    /// Handle one raw frame from the stream, in arrival order.
    ///
    /// Malformed frames are counted and dropped; they never affect the
    /// snapshot, the status or later frames.
    pub fn on_message(&mut self, raw: &str) -> FrameOutcome {
        match StreamMessage::decode(raw) {
            Ok(StreamMessage::Telemetry(update)) => {
                if update.imu.is_some() {
                    self.streamed.imu = true;
                }
                if update.barometer.is_some() {
                    self.streamed.barometer = true;
                }
                merge_field(&mut self.snapshot.imu, update.imu);
                merge_field(&mut self.snapshot.barometer, update.barometer);
                self.last_update = Some(Instant::now());
                FrameOutcome::Applied
            }
            Ok(StreamMessage::Unknown(kind)) => {
                trace!(kind = %kind, "ignoring stream frame");
                FrameOutcome::Ignored(kind)
            }
            Err(e) => self.discard(e),
        }
    }

    /// Account for a frame the transport dropped unread because of its size.
    pub fn on_oversized(&mut self, len: usize) -> FrameOutcome {
        self.discard(DecodeError::too_large(len))
    }

    /// The stream handshake completed.
    pub fn on_open(&mut self) -> bool {
        self.set_status(ConnectionStatus::Live)
    }

    /// The stream closed; the transport will retry.
    pub fn on_close(&mut self) -> bool {
        self.lost()
    }

    /// The stream errored; the transport will retry.
    pub fn on_error(&mut self) -> bool {
        self.lost()
    }

    /// Retries are exhausted or the failure is permanent.
    pub fn on_failed(&mut self) -> bool {
        self.set_status(ConnectionStatus::Failed)
    }

    /// Current merged readings.
    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    /// Current stream health.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Number of frames dropped as malformed.
    pub fn discarded_frames(&self) -> u64 {
        self.discarded_frames
    }

    /// Point-in-time copy for observers.
    pub fn view(&self) -> SyncState {
        SyncState {
            snapshot: self.snapshot.clone(),
            status: self.status,
            last_update: self.last_update,
            discarded_frames: self.discarded_frames,
        }
    }

    fn discard(&mut self, e: DecodeError) -> FrameOutcome {
        self.discarded_frames = self.discarded_frames.saturating_add(1);
        debug!(
            error = %e,
            discarded = self.discarded_frames,
            "discarding malformed stream frame"
        );
        FrameOutcome::Discarded(e)
    }

    fn lost(&mut self) -> bool {
        // Failed is terminal for the lifetime of the stream.
        if self.status == ConnectionStatus::Failed {
            return false;
        }
        self.set_status(ConnectionStatus::Reconnecting)
    }

    fn set_status(&mut self, status: ConnectionStatus) -> bool {
        if self.status == status {
            return false;
        }
        debug!(from = %self.status, to = %status, "stream status changed");
        self.status = status;
        true
    }
}

/// Overwrite `slot` with `incoming` when present. Returns whether it changed.
fn merge_field(slot: &mut Option<Value>, incoming: Option<Value>) -> bool {
    match incoming {
        Some(value) if slot.as_ref() != Some(&value) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn frame(payload: Value) -> String {
        json!({"type": "telemetry", "payload": payload}).to_string()
    }

    fn bootstrap(imu: Option<Value>, barometer: Option<Value>) -> SensorSnapshot {
        SensorSnapshot { imu, barometer }
    }

    #[test]
    fn starts_empty_and_connecting() {
        let state = TelemetryState::new();
        assert!(state.snapshot().is_empty());
        assert_eq!(state.status(), ConnectionStatus::Connecting);
        assert!(state.view().last_update.is_none());
    }

    #[test]
    fn frames_apply_field_wise_last_value() {
        let mut state = TelemetryState::new();
        state.on_bootstrap(bootstrap(Some(json!({"x": 0})), Some(json!({"p": 1013}))));

        for i in 1..=5 {
            assert!(state.on_message(&frame(json!({"imu": {"x": i}}))).notifies());
        }
        state.on_message(&frame(json!({"barometer": {"p": 990}})));
        state.on_message(&frame(json!({"imu": {"x": 9}})));

        assert_eq!(state.snapshot().imu, Some(json!({"x": 9})));
        assert_eq!(state.snapshot().barometer, Some(json!({"p": 990})));
    }

    #[test]
    fn bootstrap_kept_for_fields_stream_never_touched() {
        let mut state = TelemetryState::new();
        state.on_bootstrap(bootstrap(Some(json!({"x": 0})), Some(json!({"p": 1013}))));

        state.on_message(&frame(json!({"imu": {"x": 5}})));

        assert_eq!(
            state.snapshot(),
            &bootstrap(Some(json!({"x": 5})), Some(json!({"p": 1013})))
        );
    }

    #[test]
    fn replaying_frame_is_idempotent() {
        let mut state = TelemetryState::new();
        let raw = frame(json!({"imu": {"x": 1}, "barometer": {"p": 2}}));

        state.on_message(&raw);
        let first = state.snapshot().clone();
        let outcome = state.on_message(&raw);

        assert!(outcome.notifies());
        assert_eq!(state.snapshot(), &first);
        assert_eq!(state.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn malformed_frames_change_nothing() {
        let mut state = TelemetryState::new();
        state.on_open();
        state.on_message(&frame(json!({"imu": {"x": 1}})));
        let before = state.snapshot().clone();

        for raw in [
            "not json at all",
            "echo: ping",
            r#"{"payload":{"imu":{"x":2}}}"#,
            r#"{"type":"telemetry"}"#,
            r#"{"type":"telemetry","payload":7}"#,
            "",
        ] {
            let outcome = state.on_message(raw);
            assert!(matches!(outcome, FrameOutcome::Discarded(_)), "{raw:?}");
            assert!(!outcome.notifies());
        }

        assert_eq!(state.snapshot(), &before);
        assert_eq!(state.status(), ConnectionStatus::Live);
        assert_eq!(state.discarded_frames(), 6);
    }

    #[test]
    fn valid_frame_after_malformed_still_applies() {
        let mut state = TelemetryState::new();
        state.on_message("{{{");
        state.on_message(&frame(json!({"barometer": {"p": 1000}})));

        assert_eq!(state.snapshot().barometer, Some(json!({"p": 1000})));
        assert_eq!(state.discarded_frames(), 1);
    }

    #[test]
    fn oversized_frames_are_counted() {
        let mut state = TelemetryState::new();
        state.on_open();
        state.on_message(&frame(json!({"imu": {"x": 1}})));
        let before = state.view();

        let outcome = state.on_oversized(2 * 1024 * 1024);
        assert!(matches!(
            outcome,
            FrameOutcome::Discarded(DecodeError::TooLarge { len: 2097152, .. })
        ));
        assert!(!outcome.notifies());

        assert_eq!(state.snapshot(), &before.snapshot);
        assert_eq!(state.status(), ConnectionStatus::Live);
        assert_eq!(state.discarded_frames(), 1);
    }

    #[test]
    fn unknown_kind_ignored() {
        let mut state = TelemetryState::new();
        let outcome = state.on_message(r#"{"type":"camera","payload":{"imu":{"x":1}}}"#);

        assert!(matches!(outcome, FrameOutcome::Ignored(ref k) if k == "camera"));
        assert!(!outcome.notifies());
        assert!(state.snapshot().is_empty());
        assert_eq!(state.discarded_frames(), 0);
    }

    #[test]
    fn bootstrap_failure_then_stream_frame() {
        // A failed bootstrap never reaches the state.
        let mut state = TelemetryState::new();
        state.on_message(&frame(json!({"imu": {"x": 1}})));

        assert_eq!(state.snapshot(), &bootstrap(Some(json!({"x": 1})), None));
    }

    #[test]
    fn bootstrap_then_imu_only_frame_leaves_barometer() {
        let mut state = TelemetryState::new();
        state.on_bootstrap(bootstrap(Some(json!({"x": 0})), Some(json!({"p": 1013}))));
        state.on_message(&frame(json!({"imu": {"x": 3}})));

        assert_eq!(state.snapshot().imu, Some(json!({"x": 3})));
        assert_eq!(state.snapshot().barometer, Some(json!({"p": 1013})));
    }

    #[test]
    fn late_bootstrap_does_not_override_stream() {
        let mut state = TelemetryState::new();
        state.on_message(&frame(json!({"imu": {"x": 7}})));

        let changed =
            state.on_bootstrap(bootstrap(Some(json!({"x": 0})), Some(json!({"p": 1013}))));

        assert!(changed);
        assert_eq!(state.snapshot().imu, Some(json!({"x": 7})));
        assert_eq!(state.snapshot().barometer, Some(json!({"p": 1013})));
    }

    #[test]
    fn bootstrap_does_not_change_status() {
        let mut state = TelemetryState::new();
        state.on_bootstrap(bootstrap(Some(json!({"x": 0})), None));
        assert_eq!(state.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn empty_bootstrap_reports_no_change() {
        let mut state = TelemetryState::new();
        assert!(!state.on_bootstrap(SensorSnapshot::default()));
        assert!(state.view().last_update.is_none());
    }

    #[test]
    fn null_fields_never_clear_values() {
        let mut state = TelemetryState::new();
        state.on_bootstrap(bootstrap(Some(json!({"x": 0})), Some(json!({"p": 1}))));
        state.on_message(&frame(json!({"imu": null, "barometer": null})));
        state.on_message(&frame(json!({})));
        state.on_bootstrap(SensorSnapshot::default());

        assert_eq!(state.snapshot().imu, Some(json!({"x": 0})));
        assert_eq!(state.snapshot().barometer, Some(json!({"p": 1})));
    }

    #[test]
    fn open_goes_live() {
        let mut state = TelemetryState::new();
        assert!(state.on_open());
        assert_eq!(state.status(), ConnectionStatus::Live);
        assert!(!state.on_open());
    }

    #[test]
    fn disconnect_keeps_last_values() {
        let mut state = TelemetryState::new();
        state.on_open();
        state.on_message(&frame(json!({"imu": {"x": 1}, "barometer": {"p": 2}})));

        assert!(state.on_close());
        assert_eq!(state.status(), ConnectionStatus::Reconnecting);
        assert_eq!(state.snapshot().imu, Some(json!({"x": 1})));
        assert_eq!(state.snapshot().barometer, Some(json!({"p": 2})));

        assert!(!state.on_error());
        assert_eq!(state.status(), ConnectionStatus::Reconnecting);
    }

    #[test]
    fn reconnect_returns_to_live() {
        let mut state = TelemetryState::new();
        state.on_open();
        state.on_error();
        assert!(state.on_open());
        assert_eq!(state.status(), ConnectionStatus::Live);
    }

    #[test]
    fn failed_is_terminal_for_close_and_error() {
        let mut state = TelemetryState::new();
        state.on_message(&frame(json!({"imu": {"x": 1}})));
        state.on_close();

        assert!(state.on_failed());
        assert!(!state.on_close());
        assert!(!state.on_error());
        assert_eq!(state.status(), ConnectionStatus::Failed);
        assert_eq!(state.snapshot().imu, Some(json!({"x": 1})));
    }

    #[test]
    fn view_reflects_state() {
        let mut state = TelemetryState::new();
        state.on_open();
        state.on_message(&frame(json!({"imu": {"x": 1}})));
        state.on_message("garbage");

        let view = state.view();
        assert_eq!(view.status, ConnectionStatus::Live);
        assert_eq!(view.snapshot.imu, Some(json!({"x": 1})));
        assert_eq!(view.discarded_frames, 1);
        assert!(view.last_update.is_some());
    }
}
