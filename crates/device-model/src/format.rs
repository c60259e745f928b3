//! Capture format descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const UHD_4K: Dimensions = Dimensions::new(3840, 2160);
    pub const FHD_1080P: Dimensions = Dimensions::new(1920, 1080);
    pub const HD_720P: Dimensions = Dimensions::new(1280, 720);
    pub const SD_480P: Dimensions = Dimensions::new(640, 480);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Supported frame rates, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRateRange {
    pub min: f64,
    pub max: f64,
}

impl FrameRateRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, fps: f64) -> bool {
        fps >= self.min && fps <= self.max
    }

    /// Nearest supported rate to `fps`.
    pub fn clamp(&self, fps: f64) -> f64 {
        fps.clamp(self.min, self.max)
    }
}

/// Chroma/pixel subtype of a format, identified by its fourcc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChromaSubtype {
    /// 10-bit bi-planar 4:2:0 (`x420`), needed for wide color / HLG.
    Enhanced,
    /// 8-bit full-range 4:2:0 (`420f`).
    FullRange,
    /// 8-bit video-range 4:2:0 (`420v`).
    VideoRange,
    Other(String),
}

impl ChromaSubtype {
    pub fn from_fourcc(fourcc: &str) -> Self {
        match fourcc {
            "x420" => ChromaSubtype::Enhanced,
            "420f" => ChromaSubtype::FullRange,
            "420v" => ChromaSubtype::VideoRange,
            other => ChromaSubtype::Other(other.to_string()),
        }
    }

    pub fn fourcc(&self) -> &str {
        match self {
            ChromaSubtype::Enhanced => "x420",
            ChromaSubtype::FullRange => "420f",
            ChromaSubtype::VideoRange => "420v",
            ChromaSubtype::Other(code) => code,
        }
    }
}

impl From<String> for ChromaSubtype {
    fn from(fourcc: String) -> Self {
        ChromaSubtype::from_fourcc(&fourcc)
    }
}

impl From<ChromaSubtype> for String {
    fn from(subtype: ChromaSubtype) -> Self {
        subtype.fourcc().to_string()
    }
}

/// Autofocus hardware available in a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusSystem {
    PhaseDetection,
    ContrastDetection,
    #[default]
    None,
}

/// One capture mode of a lens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub dimensions: Dimensions,
    pub frame_rate_range: FrameRateRange,
    pub subtype: ChromaSubtype,
    #[serde(default)]
    pub focus_system: FocusSystem,
    #[serde(default)]
    pub hdr_supported: bool,
    /// Sensor pixel binning: trades per-pixel detail for sensitivity.
    #[serde(default)]
    pub binned: bool,
}

impl FormatDescriptor {
    pub fn supports_frame_rate(&self, fps: f64) -> bool {
        self.frame_rate_range.contains(fps)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}-{} fps, {}, focus {:?}",
            self.dimensions,
            self.frame_rate_range.min,
            self.frame_rate_range.max,
            self.subtype.fourcc(),
            self.focus_system,
        )?;
        if self.hdr_supported {
            write!(f, ", HDR")?;
        }
        if self.binned {
            write!(f, ", binned")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_range_is_inclusive() {
        let range = FrameRateRange::new(1.0, 60.0);
        assert!(range.contains(1.0));
        assert!(range.contains(60.0));
        assert!(!range.contains(60.01));
        assert_eq!(range.clamp(120.0), 60.0);
    }

    #[test]
    fn test_subtype_serializes_as_fourcc() {
        let json = serde_json::to_string(&ChromaSubtype::Enhanced).unwrap();
        assert_eq!(json, "\"x420\"");

        let parsed: ChromaSubtype = serde_json::from_str("\"420f\"").unwrap();
        assert_eq!(parsed, ChromaSubtype::FullRange);

        let unknown: ChromaSubtype = serde_json::from_str("\"yuvs\"").unwrap();
        assert_eq!(unknown, ChromaSubtype::Other("yuvs".to_string()));
    }

    #[test]
    fn test_format_summary() {
        let format = FormatDescriptor {
            dimensions: Dimensions::FHD_1080P,
            frame_rate_range: FrameRateRange::new(1.0, 60.0),
            subtype: ChromaSubtype::Enhanced,
            focus_system: FocusSystem::PhaseDetection,
            hdr_supported: true,
            binned: false,
        };
        assert_eq!(
            format.to_string(),
            "1920x1080 @ 1-60 fps, x420, focus PhaseDetection, HDR"
        );
    }

    #[test]
    fn test_format_deserialization_defaults_optional_flags() {
        let format: FormatDescriptor = serde_json::from_str(
            r#"{
                "dimensions": { "width": 1280, "height": 720 },
                "frame_rate_range": { "min": 1.0, "max": 30.0 },
                "subtype": "420v"
            }"#,
        )
        .unwrap();
        assert_eq!(format.focus_system, FocusSystem::None);
        assert!(!format.hdr_supported);
        assert!(!format.binned);
    }
}
