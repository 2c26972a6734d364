//! Rover REST API client.
//!
//! Async client over `reqwest` for the dashboard's request/response
//! endpoints: the sensor bootstrap read, camera snapshot capture and XBee
//! command dispatch. Also derives the telemetry stream URL from the same
//! base URL.

pub mod client;
pub mod endpoints;

pub use client::{ApiError, Client, Snapshot};
pub use endpoints::{parse_base_url, stream_url};
