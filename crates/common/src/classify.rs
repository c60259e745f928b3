//! Error classification.
//!
//! Maps every [`OpticaError`] onto a stable [`ErrorKind`] tag and turns it
//! into an [`ErrorEvent`] that observers can display without matching on
//! the error itself. The kind → category/severity/message tables are plain
//! exhaustive matches, so adding an error variant fails to compile until it
//! is classified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OpticaError;

/// Stable tag for each error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTargetDimensions,
    FormatUnavailable,
    NoFormatsAvailable,
    HdrNotSupported,
    ResourceAttach,
    DeviceLock,
    SessionBusy,
    ZoomRange,
    LensTopologyUnsupported,
    InvalidCrossover,
    Persistence,
    Recording,
    Config,
    System,
}

/// Top-level error family, matching the public taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Resource,
    Zoom,
    Persistence,
    Recording,
    System,
}

/// How bad an error is for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Degraded but the system kept (or returned to) its last good state.
    Warning,
    /// The request failed; prior state is retained.
    Error,
    /// The session cannot become usable.
    Fatal,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::InvalidTargetDimensions
            | ErrorKind::FormatUnavailable
            | ErrorKind::NoFormatsAvailable
            | ErrorKind::HdrNotSupported => ErrorCategory::Configuration,
            ErrorKind::ResourceAttach | ErrorKind::DeviceLock | ErrorKind::SessionBusy => {
                ErrorCategory::Resource
            }
            ErrorKind::ZoomRange
            | ErrorKind::LensTopologyUnsupported
            | ErrorKind::InvalidCrossover => ErrorCategory::Zoom,
            ErrorKind::Persistence => ErrorCategory::Persistence,
            ErrorKind::Recording => ErrorCategory::Recording,
            ErrorKind::Config | ErrorKind::System => ErrorCategory::System,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::FormatUnavailable
            | ErrorKind::HdrNotSupported
            | ErrorKind::SessionBusy
            | ErrorKind::ZoomRange
            | ErrorKind::Persistence => Severity::Warning,
            ErrorKind::NoFormatsAvailable => Severity::Fatal,
            ErrorKind::InvalidTargetDimensions
            | ErrorKind::ResourceAttach
            | ErrorKind::DeviceLock
            | ErrorKind::LensTopologyUnsupported
            | ErrorKind::InvalidCrossover
            | ErrorKind::Recording
            | ErrorKind::Config
            | ErrorKind::System => Severity::Error,
        }
    }

    /// User-facing text for this kind.
    pub fn display_text(self) -> &'static str {
        match self {
            ErrorKind::InvalidTargetDimensions => "The requested resolution is not supported.",
            ErrorKind::FormatUnavailable => {
                "The requested format is not available; using the best available format."
            }
            ErrorKind::NoFormatsAvailable => "No usable camera format was found.",
            ErrorKind::HdrNotSupported => "HDR video is not supported by the active format.",
            ErrorKind::ResourceAttach => "The camera or microphone could not be connected.",
            ErrorKind::DeviceLock => "The camera is busy and could not be configured.",
            ErrorKind::SessionBusy => "The camera cannot be reconfigured while recording.",
            ErrorKind::ZoomRange => "The requested zoom level is out of range.",
            ErrorKind::LensTopologyUnsupported => "This device has no lens for that request.",
            ErrorKind::InvalidCrossover => "The device reported an invalid lens switch-over table.",
            ErrorKind::Persistence => "The recording could not be saved to the library.",
            ErrorKind::Recording => "Recording failed.",
            ErrorKind::Config => "The configuration is invalid.",
            ErrorKind::System => "An unexpected error occurred.",
        }
    }
}

impl OpticaError {
    /// Stable kind tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpticaError::InvalidTargetDimensions { .. } => ErrorKind::InvalidTargetDimensions,
            OpticaError::FormatUnavailable { .. } => ErrorKind::FormatUnavailable,
            OpticaError::NoFormatsAvailable { .. } => ErrorKind::NoFormatsAvailable,
            OpticaError::HdrNotSupported { .. } => ErrorKind::HdrNotSupported,
            OpticaError::ResourceAttach { .. } => ErrorKind::ResourceAttach,
            OpticaError::DeviceLock { .. } => ErrorKind::DeviceLock,
            OpticaError::SessionBusy { .. } => ErrorKind::SessionBusy,
            OpticaError::ZoomRange { .. } => ErrorKind::ZoomRange,
            OpticaError::LensTopologyUnsupported { .. } => ErrorKind::LensTopologyUnsupported,
            OpticaError::InvalidCrossover { .. } => ErrorKind::InvalidCrossover,
            OpticaError::Persistence { .. } => ErrorKind::Persistence,
            OpticaError::Recording { .. } => ErrorKind::Recording,
            OpticaError::Config { .. } => ErrorKind::Config,
            OpticaError::Io(_) | OpticaError::Json(_) | OpticaError::Other(_) => ErrorKind::System,
        }
    }
}

/// A classified fault, handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub category: ErrorCategory,
    pub severity: Severity,
    /// Text suitable for showing to a user.
    pub message: String,
    /// The underlying error rendered for logs.
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Classify an error into an event.
pub fn classify(error: &OpticaError) -> ErrorEvent {
    let kind = error.kind();
    ErrorEvent {
        kind,
        category: kind.category(),
        severity: kind.severity(),
        message: kind.display_text().to_string(),
        detail: error.to_string(),
        at: Utc::now(),
    }
}
