//! Multi-lens zoom weighting.
//!
//! A device with several physical lenses exposes one logical zoom axis where
//! 1.0 is the wide lens at its native field of view. Each lens gets a weight
//! that converts a logical zoom value into its own native zoom factor:
//!
//! ```text
//! native = logical * weight[role]
//! ```
//!
//! Weights are derived from the device's crossover table (the logical zoom
//! levels at which it hands off between lenses):
//!
//! | lenses present            | ultra-wide | wide | telephoto       |
//! |---------------------------|------------|------|-----------------|
//! | wide                      | -          | 1.0  | -               |
//! | wide + ultra-wide         | first      | 1.0  | -               |
//! | wide + telephoto          | -          | 1.0  | 1 / first       |
//! | ultra-wide + wide + tele  | first      | 1.0  | first / last    |

use std::collections::{BTreeMap, BTreeSet};

use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::lens::{LensRole, ZoomCrossoverTable};
use serde::Serialize;

/// Native factors this close below 1.0 are float noise, not a real request.
const NATIVE_ZOOM_EPSILON: f64 = 1e-9;

/// Snapshot of per-role zoom weights for one topology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoomWeightTable {
    weights: BTreeMap<LensRole, f64>,
}

impl ZoomWeightTable {
    pub fn weight(&self, role: LensRole) -> Option<f64> {
        self.weights.get(&role).copied()
    }

    pub fn contains(&self, role: LensRole) -> bool {
        self.weights.contains_key(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = LensRole> + '_ {
        self.weights.keys().copied()
    }

    /// Logical zoom at which routing hands off to the telephoto lens.
    pub fn telephoto_threshold(&self) -> Option<f64> {
        self.weight(LensRole::Telephoto).map(|w| 1.0 / w)
    }
}

/// Where a logical zoom value lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomRoute {
    pub role: LensRole,
    pub logical_zoom: f64,
    /// Zoom factor to program into the chosen lens; never below 1.0.
    pub native_factor: f64,
}

fn positive_factor(value: Option<f64>, which: &str) -> OpticaResult<f64> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(OpticaError::invalid_crossover(format!(
            "{which} crossover factor {v} is not a positive number"
        ))),
        None => Err(OpticaError::invalid_crossover(format!(
            "{which} crossover factor is missing"
        ))),
    }
}

/// Compute the weight table for the lens roles present.
pub fn compute_weights(
    present: &BTreeSet<LensRole>,
    crossover: &ZoomCrossoverTable,
) -> OpticaResult<ZoomWeightTable> {
    if !present.contains(&LensRole::Wide) {
        return Err(OpticaError::LensTopologyUnsupported {
            role: LensRole::Wide.to_string(),
        });
    }

    let mut weights = BTreeMap::new();
    weights.insert(LensRole::Wide, 1.0);

    let ultra = present.contains(&LensRole::UltraWide);
    let tele = present.contains(&LensRole::Telephoto);

    match (ultra, tele) {
        (false, false) => {}
        (true, false) => {
            let first = positive_factor(crossover.first(), "first")?;
            weights.insert(LensRole::UltraWide, first);
        }
        (false, true) => {
            let first = positive_factor(crossover.first(), "first")?;
            weights.insert(LensRole::Telephoto, 1.0 / first);
        }
        (true, true) => {
            if crossover.factors().len() < 2 {
                return Err(OpticaError::invalid_crossover(format!(
                    "three-lens topology needs two crossover factors, got {}",
                    crossover.factors().len()
                )));
            }
            let first = positive_factor(crossover.first(), "first")?;
            let last = positive_factor(crossover.last(), "last")?;
            weights.insert(LensRole::UltraWide, first);
            weights.insert(LensRole::Telephoto, first / last);
        }
    }

    tracing::debug!(?weights, crossover = ?crossover.factors(), "Computed zoom weights");
    Ok(ZoomWeightTable { weights })
}

/// Route a logical zoom value to a lens and its native zoom factor.
pub fn route(logical_zoom: f64, weights: &ZoomWeightTable) -> OpticaResult<ZoomRoute> {
    if !logical_zoom.is_finite() || logical_zoom <= 0.0 {
        return Err(OpticaError::ZoomRange {
            logical: logical_zoom,
            native: logical_zoom,
            max: f64::INFINITY,
        });
    }

    let role = if logical_zoom < 1.0 {
        if weights.contains(LensRole::UltraWide) {
            LensRole::UltraWide
        } else {
            LensRole::Wide
        }
    } else {
        match weights.telephoto_threshold() {
            Some(threshold) if logical_zoom >= threshold => LensRole::Telephoto,
            _ => LensRole::Wide,
        }
    };

    let weight = weights
        .weight(role)
        .ok_or_else(|| OpticaError::LensTopologyUnsupported {
            role: role.to_string(),
        })?;

    let mut native_factor = logical_zoom * weight;
    if native_factor < 1.0 - NATIVE_ZOOM_EPSILON {
        return Err(OpticaError::ZoomRange {
            logical: logical_zoom,
            native: native_factor,
            max: f64::INFINITY,
        });
    }
    if native_factor < 1.0 {
        native_factor = 1.0;
    }

    Ok(ZoomRoute {
        role,
        logical_zoom,
        native_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[LensRole]) -> BTreeSet<LensRole> {
        list.iter().copied().collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_wide_only() {
        let table = compute_weights(&roles(&[LensRole::Wide]), &ZoomCrossoverTable::default()).unwrap();
        assert_eq!(table.weight(LensRole::Wide), Some(1.0));
        assert_eq!(table.roles().count(), 1);
        assert_eq!(table.telephoto_threshold(), None);
    }

    #[test]
    fn test_wide_and_ultra_wide() {
        let table = compute_weights(
            &roles(&[LensRole::UltraWide, LensRole::Wide]),
            &ZoomCrossoverTable::new(vec![2.0]),
        )
        .unwrap();
        assert_eq!(table.weight(LensRole::UltraWide), Some(2.0));
        assert_eq!(table.weight(LensRole::Wide), Some(1.0));
    }

    #[test]
    fn test_wide_and_telephoto() {
        let table = compute_weights(
            &roles(&[LensRole::Wide, LensRole::Telephoto]),
            &ZoomCrossoverTable::new(vec![2.0]),
        )
        .unwrap();
        assert_eq!(table.weight(LensRole::Telephoto), Some(0.5));

        let r = route(3.0, &table).unwrap();
        assert_eq!(r.role, LensRole::Telephoto);
        assert!(approx(r.native_factor, 1.5));

        let r = route(1.5, &table).unwrap();
        assert_eq!(r.role, LensRole::Wide);
        assert!(approx(r.native_factor, 1.5));
    }

    #[test]
    fn test_triple_camera_weights_and_routes() {
        let table = compute_weights(
            &roles(&LensRole::ALL),
            &ZoomCrossoverTable::new(vec![2.0, 5.0]),
        )
        .unwrap();
        assert_eq!(table.weight(LensRole::Wide), Some(1.0));
        assert_eq!(table.weight(LensRole::UltraWide), Some(2.0));
        assert!(approx(table.weight(LensRole::Telephoto).unwrap(), 0.4));

        let r = route(0.5, &table).unwrap();
        assert_eq!(r.role, LensRole::UltraWide);
        assert!(approx(r.native_factor, 1.0));

        let r = route(10.0, &table).unwrap();
        assert_eq!(r.role, LensRole::Telephoto);
        assert!(approx(r.native_factor, 4.0));

        let r = route(2.5, &table).unwrap();
        assert_eq!(r.role, LensRole::Telephoto);
        assert!(approx(r.native_factor, 1.0));

        let r = route(2.0, &table).unwrap();
        assert_eq!(r.role, LensRole::Wide);
    }

    #[test]
    fn test_sub_unit_native_zoom_is_rejected() {
        let table = compute_weights(&roles(&[LensRole::Wide]), &ZoomCrossoverTable::default()).unwrap();
        let err = route(0.5, &table).unwrap_err();
        assert!(matches!(err, OpticaError::ZoomRange { native, .. } if approx(native, 0.5)));

        let table = compute_weights(
            &roles(&LensRole::ALL),
            &ZoomCrossoverTable::new(vec![2.0, 5.0]),
        )
        .unwrap();
        assert!(matches!(route(0.25, &table), Err(OpticaError::ZoomRange { .. })));
    }

    #[test]
    fn test_non_positive_logical_zoom_is_rejected() {
        let table = compute_weights(&roles(&[LensRole::Wide]), &ZoomCrossoverTable::default()).unwrap();
        assert!(matches!(route(0.0, &table), Err(OpticaError::ZoomRange { .. })));
        assert!(matches!(route(f64::NAN, &table), Err(OpticaError::ZoomRange { .. })));
    }

    #[test]
    fn test_topology_without_wide_is_unsupported() {
        let err = compute_weights(
            &roles(&[LensRole::UltraWide, LensRole::Telephoto]),
            &ZoomCrossoverTable::new(vec![2.0, 5.0]),
        )
        .unwrap_err();
        assert!(matches!(err, OpticaError::LensTopologyUnsupported { .. }));
    }

    #[test]
    fn test_invalid_crossover_tables() {
        let dual = roles(&[LensRole::Wide, LensRole::Telephoto]);
        assert!(matches!(
            compute_weights(&dual, &ZoomCrossoverTable::default()),
            Err(OpticaError::InvalidCrossover { .. })
        ));
        assert!(matches!(
            compute_weights(&dual, &ZoomCrossoverTable::new(vec![0.0])),
            Err(OpticaError::InvalidCrossover { .. })
        ));
        assert!(matches!(
            compute_weights(&roles(&LensRole::ALL), &ZoomCrossoverTable::new(vec![2.0])),
            Err(OpticaError::InvalidCrossover { .. })
        ));
    }
}
