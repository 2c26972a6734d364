//! URL derivation for the rover endpoints.

use reqwest::Url;

use rover_protocol::constants::TELEMETRY_STREAM_PATH;

use crate::client::ApiError;

/// Parses and validates the rover base URL (`http` or `https`).
pub fn parse_base_url(base: &str) -> Result<Url, ApiError> {
    let url = Url::parse(base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl(format!(
            "{base}: unsupported scheme {other}"
        ))),
    }
}

/// Telemetry stream URL for a base URL.
///
/// The stream mirrors the page's transport security: `https` bases get
/// `wss`, plain `http` gets `ws`.
pub fn stream_url(base: &Url) -> Result<Url, ApiError> {
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ApiError::InvalidUrl(format!(
                "{base}: unsupported scheme {other}"
            )));
        }
    };

    let mut url = base
        .join(TELEMETRY_STREAM_PATH)
        .map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
    url.set_scheme(scheme)
        .map_err(|()| ApiError::InvalidUrl(format!("{base}: cannot use scheme {scheme}")))?;
    Ok(url)
}
