//! Application configuration
//!
//! Read once at startup from a TOML file; command-line flags override
//! individual values afterwards. Every key is optional.
//!
//! ```toml
//! profile_path = "controller_config.json"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8765
//!
//! [stream]
//! frame_rate = 60
//! frame_format = "text"
//!
//! [calibration]
//! preset = "standard"
//! hold_ms = 900
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::broadcast::subscribers::DEFAULT_QUEUE;
use crate::broadcast::StreamSettings;
use crate::calibration::{CalibrationPreset, CalibrationSettings};
use crate::codec::FrameFormat;

const CONFIG_DIR: &str = "nexuscontroller";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub profile_path: PathBuf,
    pub server: ServerConfig,
    pub stream: StreamConfig,
    pub calibration: CalibrationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from("controller_config.json"),
            server: ServerConfig::default(),
            stream: StreamConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frames buffered per subscriber before it is dropped
    pub subscriber_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            subscriber_queue: DEFAULT_QUEUE,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| eyre!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub frame_rate: u32,
    pub frame_format: FrameFormat,
    pub device_index: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            frame_format: FrameFormat::Text,
            device_index: 0,
        }
    }
}

impl StreamConfig {
    pub fn settings(&self) -> StreamSettings {
        StreamSettings {
            frame_rate: self.frame_rate,
            frame_format: self.frame_format,
            device_index: self.device_index,
            ..StreamSettings::default()
        }
    }
}

/// Preset plus optional per-value overrides
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub preset: CalibrationPreset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neutral_band: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability_ms: Option<u64>,
}

impl CalibrationConfig {
    pub fn settings(&self) -> CalibrationSettings {
        let mut settings = CalibrationSettings::preset(self.preset);
        if let Some(band) = self.neutral_band {
            settings.neutral_band = band;
        }
        if let Some(threshold) = self.trigger_threshold {
            settings.trigger_threshold = threshold;
        }
        if let Some(hold) = self.hold_ms {
            settings.hold_duration = Duration::from_millis(hold);
        }
        if let Some(stability) = self.stability_ms {
            settings.stability_window = Duration::from_millis(stability);
        }
        settings
    }
}

/// `<config dir>/nexuscontroller/config.toml`, falling back to the home directory
pub fn default_path() -> PathBuf {
    let mut path = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

impl AppConfig {
    /// Loads the config file
    ///
    /// An explicit path must exist. Without one the default location is tried
    /// and a missing file there just means defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = default_path();
                let exists = tokio::fs::try_exists(&path)
                    .await
                    .map_err(|e| eyre!("Failed to check config file {}: {}", path.display(), e))?;
                if !exists {
                    info!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

        info!("Loaded config from {}", path.display());
        debug!("Config: {:?}", config);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize config: {}", e))
    }
}
