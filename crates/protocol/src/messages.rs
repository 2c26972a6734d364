use serde::{Deserialize, Serialize};

/// Body of `POST /api/xbee/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XbeeCommandRequest {
    pub command: String,
}

/// Response to an XBee command.
///
/// The rover reports whether the serial write succeeded. Older firmware
/// answers with an empty body, so `ok` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
}

/// Error body returned by the rover on a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "detail")]
    pub error: String,
}
