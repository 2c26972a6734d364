//! Rover REST client.
//!
//! Async HTTP client using `reqwest`. All requests share one connection
//! pool and the configured request timeout.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use rover_protocol::constants::{CAMERA_SNAPSHOT_PATH, SENSORS_PATH, XBEE_SEND_PATH};
use rover_protocol::{CommandAck, ErrorBody, SensorSnapshot, XbeeCommandRequest};

use crate::endpoints::parse_base_url;

/// Errors from the rover REST client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rover error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("command is empty")]
    EmptyCommand,
}

/// A captured camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Snapshot {
    /// File extension matching the image content type.
    pub fn extension(&self) -> &'static str {
        match self.content_type.split(';').next().map(str::trim) {
            Some("image/jpeg" | "image/jpg") => "jpg",
            Some("image/png") => "png",
            Some("image/webp") => "webp",
            _ => "bin",
        }
    }
}

/// Rover REST client.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Creates a client for the rover at `base_url` (e.g. `http://rover.local:8000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// The validated base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Reads the current sensor state (`GET /api/sensors`).
    pub async fn fetch_sensors(&self) -> Result<SensorSnapshot, ApiError> {
        let url = self.endpoint(SENSORS_PATH)?;
        let resp = self.http.get(url).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        let snapshot: SensorSnapshot = serde_json::from_slice(&body)?;
        debug!(
            imu = snapshot.imu.is_some(),
            barometer = snapshot.barometer.is_some(),
            "sensor bootstrap read"
        );
        Ok(snapshot)
    }

    /// Captures a camera frame (`GET /api/camera/snapshot`).
    ///
    /// A non-success status means the rover has no image right now and
    /// yields `Ok(None)`; only transport failures are errors.
    pub async fn capture_snapshot(&self) -> Result<Option<Snapshot>, ApiError> {
        let url = self.endpoint(CAMERA_SNAPSHOT_PATH)?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            debug!(status = status.as_u16(), "no camera image available");
            return Ok(None);
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp.bytes().await?.to_vec();
        debug!(bytes = bytes.len(), content_type = %content_type, "camera snapshot captured");

        Ok(Some(Snapshot {
            bytes,
            content_type,
        }))
    }

    /// Sends a command over the rover's XBee radio (`POST /api/xbee/send`).
    ///
    /// Empty commands are rejected locally. Any success response counts as
    /// an acknowledgment; the rover's `ok` flag is surfaced when present.
    pub async fn send_command(&self, command: &str) -> Result<CommandAck, ApiError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ApiError::EmptyCommand);
        }

        let url = self.endpoint(XBEE_SEND_PATH)?;
        let body = XbeeCommandRequest {
            command: command.to_string(),
        };
        let resp = self.http.post(url).json(&body).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;

        let ack = serde_json::from_slice::<CommandAck>(&body).unwrap_or_else(|e| {
            debug!(error = %e, "command acknowledged without a readable body");
            CommandAck::default()
        });
        if ack.ok == Some(false) {
            warn!(command, "rover reported XBee send failure");
        }
        Ok(ack)
    }
}

/// Converts a non-success response into [`ApiError::Status`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
