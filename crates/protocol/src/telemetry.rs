use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latest known rover sensor readings.
///
/// Both payloads are opaque: their shape belongs to the rover firmware
/// (e.g. `{"accel": [..], "gyro": [..]}` for the IMU) and is passed through
/// untouched. A JSON `null` deserializes as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imu: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barometer: Option<Value>,
}

impl SensorSnapshot {
    /// Whether neither reading is known.
    pub fn is_empty(&self) -> bool {
        self.imu.is_none() && self.barometer.is_none()
    }
}
