//! Session target and committed session snapshot.

use serde::{Deserialize, Serialize};

use crate::format::{Dimensions, FormatDescriptor};
use crate::lens::{LensId, LensRole};

/// The configuration a caller asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTarget {
    pub dimensions: Dimensions,
    pub frame_rate: f64,
    /// Logical zoom; 1.0 is the wide lens at its native field of view.
    pub zoom: f64,
    /// Prefer enhanced (10-bit) color formats when scoring.
    pub enhanced_color: bool,
    /// Request HDR video on the active format.
    pub hdr: bool,
    /// Exposure compensation in EV; clamped into the lens range.
    #[serde(default)]
    pub exposure_bias: f64,
    /// Slow autofocus for video, where the lens supports it.
    #[serde(default)]
    pub smooth_autofocus: bool,
}

impl Default for SessionTarget {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::UHD_4K,
            frame_rate: 30.0,
            zoom: 1.0,
            enhanced_color: false,
            hdr: false,
            exposure_bias: 0.0,
            smooth_autofocus: false,
        }
    }
}

/// Whether a capture-to-file operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

/// The committed session configuration.
///
/// Only ever published whole, after a reconfiguration commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub active_lens: Option<LensId>,
    pub active_role: Option<LensRole>,
    pub active_format: Option<FormatDescriptor>,
    pub frame_rate: Option<f64>,
    pub logical_zoom: f64,
    pub native_zoom: f64,
    pub hdr_enabled: bool,
    pub exposure_bias: f64,
    pub smooth_autofocus: bool,
    pub recording: RecordingState,
    /// Number of committed reconfigurations.
    pub generation: u64,
}

impl SessionState {
    /// Whether a configuration has ever been committed.
    pub fn is_configured(&self) -> bool {
        self.active_format.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_lens: None,
            active_role: None,
            active_format: None,
            frame_rate: None,
            logical_zoom: 1.0,
            native_zoom: 1.0,
            hdr_enabled: false,
            exposure_bias: 0.0,
            smooth_autofocus: false,
            recording: RecordingState::Idle,
            generation: 0,
        }
    }
}
