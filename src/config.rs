//! Configuration file handling for parcel-scan.
//!
//! Loads configuration from `~/.config/parcel-scan/config.toml` or a custom path.
//! Precedence is CLI flags, then environment, then the file, then defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ClientConfig, RetryPolicy, API_BASE_URL_ENV, DEFAULT_API_BASE_URL};
use crate::camera::{CameraSettings, FrameCapturer, Resolution, DEFAULT_JPEG_QUALITY};
use crate::reconcile::ReferenceSource;
use crate::session::CaptureMode;

/// Configuration file structure for parcel-scan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Whole-request deadline; absent means wait indefinitely
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    /// Retries for transient network failures only
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: None,
            connect_timeout_secs: 10,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device id from `list-cameras`; the first device when absent
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let settings = CameraSettings::default();
        Self {
            device: None,
            width: settings.resolution.width,
            height: settings.resolution.height,
            fps: settings.fps,
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub jpeg_quality: u8,
    pub mode: CaptureMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mode: CaptureMode::Single,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh_interval_secs: u64,
    pub reference: ReferenceSource,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            reference: ReferenceSource::GoogleMaps,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// With no explicit path, a missing default file yields the defaults.
    /// An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound(path));
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides (`PARCEL_API_BASE_URL`).
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "capture.jpeg_quality must be between 1 and 100, got {}",
                self.capture.jpeg_quality
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(
                "camera.width and camera.height must be greater than 0".to_string(),
            ));
        }
        if self.camera.fps == 0 {
            return Err(ConfigError::Invalid(
                "camera.fps must be greater than 0".to_string(),
            ));
        }
        if self.dashboard.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.refresh_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.backend.base_url.clone(),
            request_timeout: self.backend.request_timeout_secs.map(Duration::from_secs),
            connect_timeout: Duration::from_secs(self.backend.connect_timeout_secs),
            retry: RetryPolicy::with_max_retries(self.backend.max_retries),
        }
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            resolution: Resolution {
                width: self.camera.width,
                height: self.camera.height,
            },
            fps: self.camera.fps,
        }
    }

    pub fn frame_capturer(&self) -> FrameCapturer {
        FrameCapturer::new(self.capture.jpeg_quality, self.camera.mirror)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.refresh_interval_secs)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Write the commented default config to `path`.
///
/// Refuses to overwrite an existing file.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let io_err = |e: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(io_err)
}

pub const DEFAULT_CONFIG: &str = r#"# parcel-scan configuration

[backend]
# Recognition backend (PARCEL_API_BASE_URL overrides this)
base_url = "http://localhost:5000/api"
# Whole-request deadline in seconds; unset waits indefinitely
# request_timeout_secs = 60
connect_timeout_secs = 10
# Retries for transient network failures (0 = never retry)
max_retries = 0

[camera]
# Device id from `parcel-scan list-cameras`; first device when unset
# device = "/dev/video0"
width = 1280
height = 720
fps = 30
# Mirror horizontally before encoding
mirror = false

[capture]
# JPEG quality, 1-100
jpeg_quality = 80
# single (1 parcel) or batch (3 parcels)
mode = "single"

[dashboard]
refresh_interval_secs = 300
# Reference pincode for verification: google_maps or disabled
reference = "google_maps"
"#;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("parcel-scan").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/parcel-scan/config.toml")
        })
}
