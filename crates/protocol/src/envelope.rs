use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{TELEMETRY_KIND, WS_MAX_MESSAGE_SIZE};
use crate::telemetry::SensorSnapshot;

/// Errors from decoding an inbound stream frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} frame has no payload")]
    MissingPayload { kind: String },

    #[error("{kind} payload is not an object")]
    PayloadNotObject { kind: String },

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

impl DecodeError {
    /// Rejection for a frame longer than [`WS_MAX_MESSAGE_SIZE`].
    pub fn too_large(len: usize) -> Self {
        Self::TooLarge {
            len,
            max: WS_MAX_MESSAGE_SIZE,
        }
    }
}

/// Envelope for every frame on the telemetry stream.
///
/// The `payload` field uses `serde_json::value::RawValue` to defer
/// deserialization until the `type` is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
}

/// Closed set of stream frames the dashboard understands.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Partial sensor update: only the fields present should be applied.
    Telemetry(SensorSnapshot),
    /// Well-formed envelope of a kind reserved for other consumers.
    Unknown(String),
}

impl StreamMessage {
    /// Decodes a raw text frame.
    ///
    /// Only the envelope and, for telemetry, the payload's outer object are
    /// validated. Sensor values themselves stay opaque.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        if raw.len() > WS_MAX_MESSAGE_SIZE {
            return Err(DecodeError::too_large(raw.len()));
        }
        let envelope: Envelope = serde_json::from_str(raw)?;

        if envelope.kind != TELEMETRY_KIND {
            return Ok(Self::Unknown(envelope.kind));
        }

        let payload = envelope.payload.ok_or_else(|| DecodeError::MissingPayload {
            kind: envelope.kind.clone(),
        })?;
        let fields: Map<String, Value> = serde_json::from_str(payload.get()).map_err(|_| {
            DecodeError::PayloadNotObject {
                kind: envelope.kind.clone(),
            }
        })?;
        let snapshot = serde_json::from_value(Value::Object(fields))?;
        Ok(Self::Telemetry(snapshot))
    }
}
