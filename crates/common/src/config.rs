//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::OpticaResult;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format scoring policy.
    pub scoring: ScoringConfig,

    /// Default session target.
    pub session: SessionDefaults,

    /// Where recordings are written and persisted.
    pub storage: StorageConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How the frame-rate criterion is scored.
///
/// A ranking run uses exactly one policy; the weight set travels with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRatePolicy {
    /// Bucket the maximum frame rate into preference tiers (60 > 30 > 120 > 240).
    #[default]
    Tiered,
    /// Score the maximum frame rate by its raw value.
    Raw,
}

/// Format scoring configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub frame_rate_policy: FrameRatePolicy,
}

/// Default session target values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// Logical zoom (1.0 = wide lens, no zoom).
    pub zoom: f64,
    /// Prefer enhanced (10-bit) color formats.
    pub enhanced_color: bool,
    pub hdr: bool,
    /// Exposure compensation in EV.
    pub exposure_bias: f64,
    /// Slow autofocus for video where supported.
    pub smooth_autofocus: bool,
}

/// Recording storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory capture files are written to while recording.
    pub recordings_dir: PathBuf,

    /// Library directory finished recordings are moved into.
    pub library_dir: PathBuf,

    /// File name prefix for new recordings.
    pub file_prefix: String,

    /// File extension for new recordings (without the dot).
    pub extension: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "optica=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            session: SessionDefaults::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            width: 3840,
            height: 2160,
            frame_rate: 30.0,
            zoom: 1.0,
            enhanced_color: false,
            hdr: false,
            exposure_bias: 0.0,
            smooth_autofocus: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            recordings_dir: std::env::temp_dir().join("optica"),
            library_dir: dirs_default_library(),
            file_prefix: "clip".to_string(),
            extension: "mov".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> OpticaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> OpticaResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> OpticaResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("optica").join("config.json")
}

/// Default media library directory.
fn dirs_default_library() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("optica").join("library")
}
