//! Physical lenses and device topology.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use optica_common::error::OpticaResult;
use serde::{Deserialize, Serialize};

use crate::format::FormatDescriptor;

/// Logical category of a physical lens, ordered from widest to narrowest
/// field of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensRole {
    UltraWide,
    Wide,
    Telephoto,
}

impl LensRole {
    pub const ALL: [LensRole; 3] = [LensRole::UltraWide, LensRole::Wide, LensRole::Telephoto];

    pub fn as_str(self) -> &'static str {
        match self {
            LensRole::UltraWide => "ultra-wide",
            LensRole::Wide => "wide",
            LensRole::Telephoto => "telephoto",
        }
    }
}

impl fmt::Display for LensRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of a physical lens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LensId(pub String);

impl LensId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LensId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_max_zoom() -> f64 {
    16.0
}

/// Exposure compensation a lens accepts, in EV units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureBiasRange {
    pub min: f64,
    pub max: f64,
}

impl ExposureBiasRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, bias: f64) -> bool {
        bias >= self.min && bias <= self.max
    }

    pub fn clamp(&self, bias: f64) -> f64 {
        bias.clamp(self.min, self.max)
    }
}

impl Default for ExposureBiasRange {
    fn default() -> Self {
        Self::new(-8.0, 8.0)
    }
}

/// Lens-wide controls that do not depend on the active format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensControls {
    pub exposure_bias_range: ExposureBiasRange,
    /// Whether autofocus can be slowed down for video.
    pub smooth_autofocus_supported: bool,
}

/// A physical lens and the formats it can capture in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensDescriptor {
    pub id: LensId,
    pub role: LensRole,
    /// Horizontal field of view in degrees.
    pub field_of_view_deg: f64,
    /// Largest native zoom factor the lens accepts.
    #[serde(default = "default_max_zoom")]
    pub max_zoom_factor: f64,
    /// Format catalog in discovery order.
    pub formats: Vec<FormatDescriptor>,
    #[serde(default)]
    pub controls: LensControls,
}

/// Logical zoom levels at which the device hands off between lenses,
/// in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoomCrossoverTable(pub Vec<f64>);

impl ZoomCrossoverTable {
    pub fn new(factors: Vec<f64>) -> Self {
        Self(factors)
    }

    pub fn first(&self) -> Option<f64> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    pub fn factors(&self) -> &[f64] {
        &self.0
    }
}

/// What a device reports about its physical lenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Human-readable device name.
    #[serde(default)]
    pub name: String,
    pub lenses: Vec<LensDescriptor>,
    #[serde(default)]
    pub crossover: ZoomCrossoverTable,
    /// Microphone identifier, if one is present.
    #[serde(default)]
    pub microphone: Option<String>,
}

impl Topology {
    /// Roles of all lenses present.
    pub fn roles(&self) -> BTreeSet<LensRole> {
        self.lenses.iter().map(|lens| lens.role).collect()
    }

    /// First lens with the given role.
    pub fn lens(&self, role: LensRole) -> Option<&LensDescriptor> {
        self.lenses.iter().find(|lens| lens.role == role)
    }

    pub fn lens_by_id(&self, id: &LensId) -> Option<&LensDescriptor> {
        self.lenses.iter().find(|lens| &lens.id == id)
    }

    /// Parse a topology from JSON.
    pub fn from_json(json: &str) -> OpticaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a topology description from a JSON file.
    pub fn load(path: &Path) -> OpticaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUAL: &str = r#"{
        "name": "dual",
        "lenses": [
            { "id": "back-tele", "role": "telephoto", "field_of_view_deg": 30.0, "formats": [] },
            { "id": "back-wide", "role": "wide", "field_of_view_deg": 70.0, "max_zoom_factor": 10.0, "formats": [],
              "controls": { "exposure_bias_range": { "min": -4.0, "max": 4.0 }, "smooth_autofocus_supported": true } }
        ],
        "crossover": [2.0],
        "microphone": "builtin-mic"
    }"#;

    #[test]
    fn test_topology_from_json() {
        let topology = Topology::from_json(DUAL).unwrap();
        assert_eq!(topology.lenses.len(), 2);
        assert_eq!(topology.crossover.first(), Some(2.0));
        assert_eq!(topology.microphone.as_deref(), Some("builtin-mic"));
        assert_eq!(topology.lens(LensRole::Telephoto).unwrap().max_zoom_factor, 16.0);
        assert_eq!(topology.lens(LensRole::Wide).unwrap().max_zoom_factor, 10.0);
    }

    #[test]
    fn test_lens_controls_default_when_omitted() {
        let topology = Topology::from_json(DUAL).unwrap();

        let tele = topology.lens(LensRole::Telephoto).unwrap();
        assert_eq!(tele.controls, LensControls::default());
        assert!(!tele.controls.smooth_autofocus_supported);

        let wide = topology.lens(LensRole::Wide).unwrap();
        assert!(wide.controls.smooth_autofocus_supported);
        assert!(wide.controls.exposure_bias_range.contains(-4.0));
        assert_eq!(wide.controls.exposure_bias_range.clamp(6.0), 4.0);
    }

    #[test]
    fn test_roles_are_ordered_by_field_of_view() {
        let topology = Topology::from_json(DUAL).unwrap();
        let roles: Vec<_> = topology.roles().into_iter().collect();
        assert_eq!(roles, vec![LensRole::Wide, LensRole::Telephoto]);
        assert!(LensRole::UltraWide < LensRole::Wide);
    }

    #[test]
    fn test_lens_lookup_by_id() {
        let topology = Topology::from_json(DUAL).unwrap();
        let lens = topology.lens_by_id(&LensId::new("back-wide")).unwrap();
        assert_eq!(lens.role, LensRole::Wide);
        assert!(topology.lens_by_id(&LensId::new("front")).is_none());
    }
}
