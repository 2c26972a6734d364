pub mod constants;
pub mod envelope;
pub mod messages;
pub mod telemetry;

// Re-export primary types for convenience.
pub use envelope::{DecodeError, Envelope, StreamMessage};
pub use messages::{CommandAck, ErrorBody, XbeeCommandRequest};
pub use telemetry::SensorSnapshot;
