//! Error types shared across Optica crates.

use std::path::PathBuf;

/// Top-level error type for Optica operations.
#[derive(Debug, thiserror::Error)]
pub enum OpticaError {
    #[error("Target dimensions {width}x{height} are not a recognized capture tier")]
    InvalidTargetDimensions { width: u32, height: u32 },

    #[error("No format matches {width}x{height} at {frame_rate} fps")]
    FormatUnavailable {
        width: u32,
        height: u32,
        frame_rate: f64,
    },

    #[error("Lens {lens} exposes no capture formats")]
    NoFormatsAvailable { lens: String },

    #[error("Active format on lens {lens} does not support HDR video")]
    HdrNotSupported { lens: String },

    #[error("Cannot attach {resource}: {message}")]
    ResourceAttach { resource: String, message: String },

    #[error("Cannot lock lens {lens} for configuration: {message}")]
    DeviceLock { lens: String, message: String },

    #[error("Capture session is busy: {message}")]
    SessionBusy { message: String },

    #[error("Zoom {logical} maps to native factor {native}, outside 1.0..={max}")]
    ZoomRange { logical: f64, native: f64, max: f64 },

    #[error("Lens topology does not provide a {role} lens")]
    LensTopologyUnsupported { role: String },

    #[error("Invalid zoom crossover table: {message}")]
    InvalidCrossover { message: String },

    #[error("Failed to persist {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("Recording error: {message}")]
    Recording { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using OpticaError.
pub type OpticaResult<T> = Result<T, OpticaError>;

impl OpticaError {
    pub fn resource_attach(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ResourceAttach {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    pub fn device_lock(lens: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DeviceLock {
            lens: lens.into(),
            message: msg.into(),
        }
    }

    pub fn session_busy(msg: impl Into<String>) -> Self {
        Self::SessionBusy {
            message: msg.into(),
        }
    }

    pub fn invalid_crossover(msg: impl Into<String>) -> Self {
        Self::InvalidCrossover {
            message: msg.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn recording(msg: impl Into<String>) -> Self {
        Self::Recording {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the system stays usable in its last good state after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FormatUnavailable { .. }
                | Self::HdrNotSupported { .. }
                | Self::ZoomRange { .. }
                | Self::SessionBusy { .. }
                | Self::Persistence { .. }
        )
    }
}
