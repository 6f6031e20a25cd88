//! Application configuration
//!
//! Loaded from a JSON or TOML file; every section falls back to its defaults.

use serde::{Deserialize, Serialize};
use skypilot_core::PilotConfig;
use skypilot_eye::TranscoderConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Log file written alongside stdout
    pub log_file: Option<PathBuf>,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.address
            .parse::<IpAddr>()
            .map_err(|_| format!("Invalid bind address: {}", self.address))?;
        if self.log_level.trim().is_empty() {
            return Err("Log level must not be empty".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::Invalid(format!("Invalid bind address: {}", self.address)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pilot: PilotConfig,
    pub transcoder: TranscoderConfig,
    /// Start the transcoder and frame pipeline when the vehicle connects
    pub video_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pilot: PilotConfig::default(),
            transcoder: TranscoderConfig::default(),
            video_enabled: true,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse JSON, falling back to TOML
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        if let Ok(config) = serde_json::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        toml::from_str::<AppConfig>(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate().map_err(ConfigError::Invalid)?;
        self.pilot.validate().map_err(ConfigError::Invalid)?;
        self.transcoder.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert!(config.video_enabled);
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "0.0.0.0:8080".parse().unwrap()
        );
    }

    #[test]
    fn test_from_json() {
        let config = AppConfig::from_str(
            r#"{"server": {"port": 9000}, "pilot": {"jpeg_quality": 70}, "video_enabled": false}"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.pilot.jpeg_quality, 70);
        assert_eq!(config.pilot.patrol_interval_ms, 3000);
        assert!(!config.video_enabled);
    }

    #[test]
    fn test_from_toml() {
        let config = AppConfig::from_str(
            r#"
            [server]
            address = "127.0.0.1"
            log_file = "/var/log/skypilot.log"

            [transcoder]
            hwaccel_args = []
            "#,
        )
        .unwrap();
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(
            config.server.log_file,
            Some(PathBuf::from("/var/log/skypilot.log"))
        );
        assert!(config.transcoder.hwaccel_args.is_empty());
        assert_eq!(config.transcoder.program, "ffmpeg");
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(AppConfig::from_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            AppConfig::from_str("{not: valid"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut config = AppConfig::default();
        config.server.address = "localhost:80".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skypilot.toml");
        std::fs::write(&path, "[server]\nport = 8181\n").unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap().server.port, 8181);

        assert!(matches!(
            AppConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
