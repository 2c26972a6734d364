//! Telemetry synchronizer for the rover dashboard.
//!
//! Bootstraps sensor state with one REST read, keeps it live over the
//! `/ws/telemetry` WebSocket with automatic reconnection, and publishes
//! point-in-time copies of the merged state to observers.

mod notifier;
mod pumps;
pub(crate) mod stream;
pub mod synchronizer;
pub mod types;

pub use rover_telemetry::{ConnectionStatus, SyncState};
pub use synchronizer::Synchronizer;
pub use types::{ReconnectConfig, SyncConfig, SyncError};
