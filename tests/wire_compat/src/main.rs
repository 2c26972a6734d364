fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use rover_protocol::constants::TELEMETRY_KIND;
    use rover_protocol::{
        CommandAck, Envelope, ErrorBody, SensorSnapshot, StreamMessage, XbeeCommandRequest,
    };
    use rover_telemetry::{ConnectionStatus, TelemetryState};
    use serde_json::json;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Raw fixture text, exactly as the rover sends it.
    fn load_raw(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&load_raw(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// The rover writes `20.0` where other producers may emit `20`.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, float-normalized comparison).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  rover: {fixture}\n  Rust:  {reserialized}"
        );
    }

    // --- REST bodies ---

    #[test]
    fn fixture_sensors_response() {
        roundtrip_test::<SensorSnapshot>("sensors_response.json");
    }

    #[test]
    fn fixture_sensors_null_field_is_absent() {
        let snapshot: SensorSnapshot = serde_json::from_value(load_fixture("sensors_response_null_imu.json")).unwrap();
        assert!(snapshot.imu.is_none());
        assert_eq!(snapshot.barometer.unwrap()["pressure_hpa"], json!(1009.8));
    }

    #[test]
    fn fixture_xbee_send_request() {
        roundtrip_test::<XbeeCommandRequest>("xbee_send_request.json");
    }

    #[test]
    fn fixture_xbee_send_response() {
        roundtrip_test::<CommandAck>("xbee_send_response.json");
    }

    #[test]
    fn fixture_error_bodies() {
        let body: ErrorBody = serde_json::from_value(load_fixture("sensors_error.json")).unwrap();
        assert_eq!(body.error, "I2C bus not available");

        let body: ErrorBody = serde_json::from_value(load_fixture("http_exception.json")).unwrap();
        assert_eq!(body.error, "No command provided");
    }

    // --- Stream frames ---

    #[test]
    fn fixture_telemetry_frame_decodes() {
        let raw = load_raw("telemetry_frame.json");
        let fixture = load_fixture("telemetry_frame.json");

        match StreamMessage::decode(&raw).unwrap() {
            StreamMessage::Telemetry(snapshot) => {
                assert_eq!(snapshot.imu.as_ref(), Some(&fixture["payload"]["imu"]));
                assert_eq!(
                    snapshot.barometer.as_ref(),
                    Some(&fixture["payload"]["barometer"])
                );
            }
            other => panic!("expected telemetry, got {other:?}"),
        }
    }

    #[test]
    fn fixture_telemetry_envelope_roundtrip() {
        let raw = load_raw("telemetry_frame.json");
        let envelope: Envelope = serde_json::from_str(&raw).unwrap();
        let reserialized: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();

        assert_eq!(
            normalize_value(&load_fixture("telemetry_frame.json")),
            normalize_value(&reserialized)
        );
    }

    #[test]
    fn built_telemetry_frame_matches_rover_shape() {
        let fixture = load_fixture("telemetry_frame.json");
        let snapshot: SensorSnapshot = serde_json::from_value(fixture["payload"].clone()).unwrap();

        let payload = serde_json::to_string(&snapshot).unwrap();
        let envelope = Envelope {
            kind: TELEMETRY_KIND.into(),
            payload: Some(serde_json::value::RawValue::from_string(payload).unwrap()),
        };
        let built = serde_json::to_value(&envelope).unwrap();

        assert_eq!(normalize_value(&built), normalize_value(&fixture));
    }

    #[test]
    fn fixture_sensor_error_payload_is_opaque() {
        let raw = load_raw("telemetry_frame_sensor_error.json");
        let StreamMessage::Telemetry(snapshot) = StreamMessage::decode(&raw).unwrap() else {
            panic!("expected telemetry");
        };
        assert_eq!(snapshot.imu, Some(json!({"error": "sensor not responding"})));
    }

    // --- Rover session replay ---

    #[test]
    fn replay_bootstrap_then_stream() {
        let mut state = TelemetryState::new();

        let bootstrap: SensorSnapshot =
            serde_json::from_value(load_fixture("sensors_response_null_imu.json")).unwrap();
        assert!(state.on_bootstrap(bootstrap));
        assert!(state.on_open());

        // The rover echoes anything the client sends; those frames are noise.
        assert!(!state.on_message("echo: hello").notifies());
        assert!(state.on_message(&load_raw("telemetry_frame_sensor_error.json")).notifies());
        assert!(state.on_message(&load_raw("telemetry_frame.json")).notifies());

        let fixture = load_fixture("telemetry_frame.json");
        let view = state.view();
        assert_eq!(view.status, ConnectionStatus::Live);
        assert_eq!(view.snapshot.imu.as_ref(), Some(&fixture["payload"]["imu"]));
        assert_eq!(
            view.snapshot.barometer.as_ref(),
            Some(&fixture["payload"]["barometer"])
        );
        assert_eq!(view.discarded_frames, 1);
    }
}
