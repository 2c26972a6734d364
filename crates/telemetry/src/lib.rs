//! Telemetry synchronization state for the rover dashboard.
//!
//! Pure and synchronous: the runtime in `rover-link` feeds bootstrap
//! results and stream events into [`TelemetryState`] from a single task
//! and publishes the resulting [`SyncState`] to observers.

pub mod state;
pub mod status;

pub use state::{FrameOutcome, TelemetryState};
pub use status::{ConnectionStatus, SyncState};
