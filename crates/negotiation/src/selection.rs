//! Format selection against a caller's target.
//!
//! Policy: walk the ranked catalog and take the first format whose
//! dimension tier does not exceed the target's tier and whose frame-rate
//! range contains the target rate. Exact dimension matches are not
//! required since lenses rarely expose every tier. When nothing qualifies
//! the best-ranked format is used and the selection is marked degraded.

use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::format::{Dimensions, FormatDescriptor};

use crate::scoring::{dimension_score, ScoredFormat};

/// Outcome of a selection.
#[derive(Debug)]
pub enum Selection {
    /// A format satisfying the target.
    Matched(ScoredFormat),
    /// No format satisfied the target; the best-ranked format stands in.
    Fallback {
        format: ScoredFormat,
        /// Always [`OpticaError::FormatUnavailable`].
        warning: OpticaError,
    },
}

impl Selection {
    pub fn scored(&self) -> &ScoredFormat {
        match self {
            Selection::Matched(format) | Selection::Fallback { format, .. } => format,
        }
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.scored().format
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Selection::Fallback { .. })
    }

    /// Split into the chosen format and the degradation warning, if any.
    pub fn into_parts(self) -> (ScoredFormat, Option<OpticaError>) {
        match self {
            Selection::Matched(format) => (format, None),
            Selection::Fallback { format, warning } => (format, Some(warning)),
        }
    }
}

/// Select the best admissible format from a ranked catalog.
pub fn select(
    ranked: &[ScoredFormat],
    target: Dimensions,
    target_frame_rate: f64,
) -> OpticaResult<Selection> {
    let target_score = dimension_score(target);
    if target_score == 0 {
        return Err(OpticaError::InvalidTargetDimensions {
            width: target.width,
            height: target.height,
        });
    }

    let best = ranked.first().ok_or_else(|| OpticaError::NoFormatsAvailable {
        lens: "catalog".to_string(),
    })?;

    if let Some(found) = ranked.iter().find(|scored| {
        scored.dimension_score <= target_score && scored.format.supports_frame_rate(target_frame_rate)
    }) {
        tracing::debug!(
            target = %target,
            fps = target_frame_rate,
            selected = %found.format,
            "Selected format"
        );
        return Ok(Selection::Matched(found.clone()));
    }

    tracing::warn!(
        target = %target,
        fps = target_frame_rate,
        fallback = %best.format,
        "No format matches target, falling back to best-ranked"
    );

    Ok(Selection::Fallback {
        format: best.clone(),
        warning: OpticaError::FormatUnavailable {
            width: target.width,
            height: target.height,
            frame_rate: target_frame_rate,
        },
    })
}
