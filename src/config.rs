//! # Configuration Module
//!
//! TOML configuration for the bridge. Every field has a default, so a partial
//! file (or none at all) is valid:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//!
//! [timing]
//! settle_ms = 2000
//! refresh_delay_ms = 100
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub timing: TimingConfig,
    pub logging: LoggingConfig,
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SerialConfig {
    /// Fixed device path. When unset the bridge scans for `auto_connect_pattern`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Case-insensitive substring matched against discovered port names.
    pub auto_connect_pattern: String,
    /// Longest line accepted from the device; longer lines are discarded.
    pub max_line_len: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            read_timeout_ms: 2_000,
            auto_connect_pattern: "usbmodem".to_string(),
            max_line_len: 4_096,
        }
    }
}

/// Fixed pauses used in place of acknowledgements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Device reboot time after the port is opened (DTR toggle).
    pub settle_ms: u64,
    /// Delay before the `GET_MEMORY` follow-up after a mutating event.
    pub refresh_delay_ms: u64,
    /// Spacing of the initial `GET_MEMORY`/`GET_CARDS`/`GET_LOGS` fetch.
    pub startup_fetch_delay_ms: u64,
    /// Sleep after a read that produced no data.
    pub idle_poll_ms: u64,
    /// Wait before the one-shot auto-connect scan.
    pub auto_connect_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2_000,
            refresh_delay_ms: 100,
            startup_fetch_delay_ms: 500,
            idle_poll_ms: 100,
            auto_connect_delay_ms: 2_000,
        }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn startup_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.startup_fetch_delay_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn auto_connect_delay(&self) -> Duration {
        Duration::from_millis(self.auto_connect_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            BridgeError::invalid_config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Create a default configuration file
    pub async fn create_default(path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| BridgeError::invalid_config(e.to_string()))?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(BridgeError::invalid_config("baud_rate must be positive"));
        }
        if self.serial.max_line_len == 0 {
            return Err(BridgeError::invalid_config("max_line_len must be positive"));
        }
        if self.timing.idle_poll_ms == 0 {
            return Err(BridgeError::invalid_config(
                "idle_poll_ms must be positive",
            ));
        }
        if self.serial.auto_connect_pattern.trim().is_empty() {
            return Err(BridgeError::invalid_config(
                "auto_connect_pattern must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_device_link() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.read_timeout_ms, 2_000);
        assert_eq!(config.timing.refresh_delay(), Duration::from_millis(100));
        assert_eq!(config.timing.settle(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[serial]\nport = \"/dev/ttyACM0\"\n").unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial.max_line_len, 4_096);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_baud() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(matches!(
            config.validate(),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_idle_poll() {
        let mut config = Config::default();
        config.timing.idle_poll_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_create_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        Config::create_default(&path).await.unwrap();
        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_malformed_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        tokio::fs::write(&path, "serial = 3").await.unwrap();
        assert!(matches!(
            Config::load(&path).await,
            Err(BridgeError::InvalidConfig(_))
        ));
    }
}
