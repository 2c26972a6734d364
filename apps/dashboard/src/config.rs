//! Dashboard configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/rover-dashboard/dashboard.toml`
//! - Windows: `%APPDATA%/rover-dashboard/dashboard.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rover_link::{ReconnectConfig, SyncConfig};
use rover_protocol::constants::{HTTP_REQUEST_TIMEOUT, TELEMETRY_PUSH_PERIOD};

/// Missed rover pushes before readings are flagged stale.
const STALE_AFTER_MISSED_PUSHES: u32 = 5;

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Rover backend, e.g. `http://192.168.4.1:8000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for each REST request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Readings older than this are shown as stale.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Reconnection attempts before giving up (0 = never give up).
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Where captured snapshots are written.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}

fn default_request_timeout_secs() -> u64 {
    HTTP_REQUEST_TIMEOUT.as_secs()
}

fn default_stale_after_secs() -> u64 {
    (TELEMETRY_PUSH_PERIOD * STALE_AFTER_MISSED_PUSHES).as_secs()
}

fn default_max_reconnect_attempts() -> u32 {
    20
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            stale_after_secs: default_stale_after_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl DashboardConfig {
    /// Loads configuration from the default location, creating it if missing.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, or writes a default there if not found.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DashboardConfig = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = DashboardConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Synchronizer settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let max_attempts = match self.max_reconnect_attempts {
            0 => None,
            n => Some(n),
        };
        SyncConfig {
            reconnect: ReconnectConfig {
                max_attempts,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("rover-dashboard")
            .join("dashboard.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata)
            .join("rover-dashboard")
            .join("dashboard.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/rover-dashboard/dashboard.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.stale_after(), Duration::from_secs(5));
        assert_eq!(config.sync_config().reconnect.max_attempts, Some(20));
    }

    #[test]
    fn config_partial_toml() {
        let config: DashboardConfig =
            toml::from_str(r#"base_url = "http://192.168.4.1:8000""#).unwrap();
        assert_eq!(config.base_url, "http://192.168.4.1:8000");
        assert_eq!(config.stale_after_secs, 5);
        assert_eq!(config.snapshot_dir, PathBuf::from("."));
    }

    #[test]
    fn zero_attempts_means_unlimited() {
        let config = DashboardConfig {
            max_reconnect_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.sync_config().reconnect.max_attempts, None);
    }

    #[test]
    fn zero_timeout_clamped() {
        let config = DashboardConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn load_creates_default_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("dashboard.toml");

        let config = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dashboard.toml");

        let config = DashboardConfig {
            base_url: "https://rover.local".into(),
            max_reconnect_attempts: 3,
            snapshot_dir: tmp.path().join("shots"),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dashboard.toml");
        std::fs::write(&path, "base_url = [").unwrap();

        assert!(DashboardConfig::load_from(&path).is_err());
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("rover-dashboard"));
    }
}
