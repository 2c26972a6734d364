use std::time::Duration;

/// Bootstrap read of the current sensor state.
pub const SENSORS_PATH: &str = "/api/sensors";

/// Persistent telemetry push channel.
pub const TELEMETRY_STREAM_PATH: &str = "/ws/telemetry";

/// On-demand camera capture.
pub const CAMERA_SNAPSHOT_PATH: &str = "/api/camera/snapshot";

/// XBee radio command dispatch.
pub const XBEE_SEND_PATH: &str = "/api/xbee/send";

/// Envelope `type` of a telemetry push.
pub const TELEMETRY_KIND: &str = "telemetry";

/// How often the rover pushes a telemetry frame.
pub const TELEMETRY_PUSH_PERIOD: Duration = Duration::from_secs(1);

/// Maximum accepted size of a single inbound stream frame (1 MiB).
///
/// Telemetry frames are a few hundred bytes; anything near this size is
/// not a sensor reading.
pub const WS_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// How often to send keepalive pings on the telemetry stream.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(10);

/// Read deadline on the telemetry stream.
///
/// Any inbound frame (telemetry, pong, ping) resets it. The rover pushes
/// every [`TELEMETRY_PUSH_PERIOD`], so silence this long means the link is
/// dead even if the socket is still open.
pub const WS_READ_DEADLINE: Duration = Duration::from_secs(30);

/// Default timeout for REST requests, including the bootstrap read.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
