//! Format scoring.
//!
//! Each format gets five sub-scores, combined into one number as a weighted
//! sum. The weights are separated so that the criteria compare
//! lexicographically:
//!
//! ```text
//! dimension  >  binning  >  frame rate  >  chroma subtype  >  focus
//! ```
//!
//! i.e. the smallest step of any criterion outweighs the largest possible
//! contribution of every criterion below it. [`ScoreWeights::separates`]
//! checks this for a weight set.

use optica_common::config::FrameRatePolicy;
use optica_device_model::format::{ChromaSubtype, Dimensions, FocusSystem, FormatDescriptor};
use serde::Serialize;

/// Smallest non-zero step of the dimension criterion.
pub const DIMENSION_STEP: u64 = 10;
pub const MAX_BINNED_SCORE: u64 = 5;
pub const MAX_TIERED_FRAME_RATE_SCORE: u64 = 8;
/// Raw frame-rate scores are capped so the weight separation holds.
pub const MAX_RAW_FRAME_RATE_SCORE: u64 = 999;
pub const MAX_SUBTYPE_SCORE: u64 = 4;
pub const MAX_FOCUS_SCORE: u64 = 4;

const TIERED_FRAME_RATE_STEP: u64 = 2;
const RAW_FRAME_RATE_STEP: u64 = 1;
const SUBTYPE_STEP: u64 = 2;

/// Multipliers applied to each sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreWeights {
    pub dimension: u64,
    pub binned: u64,
    pub frame_rate: u64,
    pub subtype: u64,
    pub focus: u64,
}

impl ScoreWeights {
    /// Weights for tiered frame-rate scoring.
    pub const TIERED: ScoreWeights = ScoreWeights {
        dimension: 10_000,
        binned: 1_000,
        frame_rate: 100,
        subtype: 10,
        focus: 1,
    };

    /// Weights for raw frame-rate scoring; binning and dimension are pushed
    /// above the widest raw frame-rate contribution.
    pub const RAW: ScoreWeights = ScoreWeights {
        dimension: 100_000,
        binned: 100_000,
        frame_rate: 100,
        subtype: 10,
        focus: 1,
    };

    pub fn for_policy(policy: FrameRatePolicy) -> Self {
        match policy {
            FrameRatePolicy::Tiered => Self::TIERED,
            FrameRatePolicy::Raw => Self::RAW,
        }
    }

    /// Whether every criterion strictly dominates all criteria below it.
    pub fn separates(&self, policy: FrameRatePolicy) -> bool {
        let (fps_step, fps_max) = match policy {
            FrameRatePolicy::Tiered => (TIERED_FRAME_RATE_STEP, MAX_TIERED_FRAME_RATE_SCORE),
            FrameRatePolicy::Raw => (RAW_FRAME_RATE_STEP, MAX_RAW_FRAME_RATE_SCORE),
        };

        let focus_max = MAX_FOCUS_SCORE * self.focus;
        let subtype_max = MAX_SUBTYPE_SCORE * self.subtype + focus_max;
        let fps_max = fps_max * self.frame_rate + subtype_max;
        let binned_max = MAX_BINNED_SCORE * self.binned + fps_max;

        SUBTYPE_STEP * self.subtype > focus_max
            && fps_step * self.frame_rate > subtype_max
            && MAX_BINNED_SCORE * self.binned > fps_max
            && DIMENSION_STEP * self.dimension > binned_max
    }
}

/// A format together with its score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFormat {
    pub format: FormatDescriptor,
    /// Position in the lens's discovery-order catalog.
    pub index: usize,
    pub score: u64,
    pub dimension_score: u64,
    pub binned_score: u64,
    pub frame_rate_score: u64,
    pub subtype_score: u64,
    pub focus_score: u64,
    pub hdr_supported: bool,
    pub enhanced_subtype_supported: bool,
}

/// Scores formats under one frame-rate policy.
#[derive(Debug, Clone, Copy)]
pub struct FormatScorer {
    policy: FrameRatePolicy,
    weights: ScoreWeights,
}

impl FormatScorer {
    pub fn new(policy: FrameRatePolicy) -> Self {
        Self {
            policy,
            weights: ScoreWeights::for_policy(policy),
        }
    }

    pub fn policy(&self) -> FrameRatePolicy {
        self.policy
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Score one format. `enhanced_color` is the caller's feature toggle.
    pub fn score(&self, format: &FormatDescriptor, index: usize, enhanced_color: bool) -> ScoredFormat {
        let dimension_score = dimension_score(format.dimensions);
        let binned_score = binned_score(format);
        let frame_rate_score = frame_rate_score(format, self.policy);
        let subtype_score = subtype_score(format, enhanced_color);
        let focus_score = focus_score(format);

        let w = &self.weights;
        let score = dimension_score * w.dimension
            + binned_score * w.binned
            + frame_rate_score * w.frame_rate
            + subtype_score * w.subtype
            + focus_score * w.focus;

        ScoredFormat {
            format: format.clone(),
            index,
            score,
            dimension_score,
            binned_score,
            frame_rate_score,
            subtype_score,
            focus_score,
            hdr_supported: format.hdr_supported,
            enhanced_subtype_supported: subtype_score == MAX_SUBTYPE_SCORE,
        }
    }
}

impl Default for FormatScorer {
    fn default() -> Self {
        Self::new(FrameRatePolicy::default())
    }
}

/// Quality tier of exact capture dimensions; unrecognized sizes score 0.
pub fn dimension_score(dimensions: Dimensions) -> u64 {
    match (dimensions.width, dimensions.height) {
        (3840, 2160) => DIMENSION_STEP * 4,
        (1920, 1080) => DIMENSION_STEP * 3,
        (1280, 720) => DIMENSION_STEP * 2,
        (640, 480) => DIMENSION_STEP,
        _ => 0,
    }
}

pub fn binned_score(format: &FormatDescriptor) -> u64 {
    if format.binned {
        0
    } else {
        MAX_BINNED_SCORE
    }
}

pub fn frame_rate_score(format: &FormatDescriptor, policy: FrameRatePolicy) -> u64 {
    let max = format.frame_rate_range.max;
    if !max.is_finite() || max <= 0.0 {
        return 0;
    }
    let fps = max.round() as u64;

    match policy {
        FrameRatePolicy::Tiered => match fps {
            60 => TIERED_FRAME_RATE_STEP * 4,
            30 => TIERED_FRAME_RATE_STEP * 3,
            120 => TIERED_FRAME_RATE_STEP * 2,
            240 => TIERED_FRAME_RATE_STEP,
            _ => 0,
        },
        FrameRatePolicy::Raw => fps.min(MAX_RAW_FRAME_RATE_SCORE),
    }
}

/// Enhanced subtype only pays off when the caller asked for enhanced color.
pub fn subtype_score(format: &FormatDescriptor, enhanced_color: bool) -> u64 {
    match format.subtype {
        ChromaSubtype::Enhanced if enhanced_color => SUBTYPE_STEP * 2,
        ChromaSubtype::FullRange => SUBTYPE_STEP,
        _ => 0,
    }
}

pub fn focus_score(format: &FormatDescriptor) -> u64 {
    match format.focus_system {
        FocusSystem::PhaseDetection => 4,
        FocusSystem::ContrastDetection => 2,
        FocusSystem::None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optica_device_model::format::FrameRateRange;
    use proptest::prelude::*;

    fn format(
        dimensions: Dimensions,
        max_fps: f64,
        subtype: ChromaSubtype,
        focus_system: FocusSystem,
        binned: bool,
    ) -> FormatDescriptor {
        FormatDescriptor {
            dimensions,
            frame_rate_range: FrameRateRange::new(1.0, max_fps),
            subtype,
            focus_system,
            hdr_supported: false,
            binned,
        }
    }

    #[test]
    fn test_weight_sets_separate_criteria() {
        assert!(ScoreWeights::TIERED.separates(FrameRatePolicy::Tiered));
        assert!(ScoreWeights::RAW.separates(FrameRatePolicy::Raw));
        // The tiered weights cannot carry raw frame rates.
        assert!(!ScoreWeights::TIERED.separates(FrameRatePolicy::Raw));
    }

    #[test]
    fn test_dimension_tiers() {
        assert_eq!(dimension_score(Dimensions::UHD_4K), 40);
        assert_eq!(dimension_score(Dimensions::FHD_1080P), 30);
        assert_eq!(dimension_score(Dimensions::HD_720P), 20);
        assert_eq!(dimension_score(Dimensions::SD_480P), 10);
        assert_eq!(dimension_score(Dimensions::new(4032, 3024)), 0);
    }

    #[test]
    fn test_tiered_frame_rate_prefers_sixty() {
        let at = |fps| {
            frame_rate_score(
                &format(Dimensions::FHD_1080P, fps, ChromaSubtype::VideoRange, FocusSystem::None, false),
                FrameRatePolicy::Tiered,
            )
        };
        assert_eq!(at(60.0), 8);
        assert_eq!(at(30.0), 6);
        assert_eq!(at(120.0), 4);
        assert_eq!(at(240.0), 2);
        assert_eq!(at(25.0), 0);
        assert_eq!(at(59.94), 8);
    }

    #[test]
    fn test_raw_frame_rate_is_capped() {
        let fast = format(Dimensions::HD_720P, 5000.0, ChromaSubtype::VideoRange, FocusSystem::None, false);
        assert_eq!(frame_rate_score(&fast, FrameRatePolicy::Raw), MAX_RAW_FRAME_RATE_SCORE);

        let normal = format(Dimensions::HD_720P, 120.0, ChromaSubtype::VideoRange, FocusSystem::None, false);
        assert_eq!(frame_rate_score(&normal, FrameRatePolicy::Raw), 120);
    }

    #[test]
    fn test_enhanced_subtype_needs_feature_flag() {
        let enhanced = format(Dimensions::UHD_4K, 30.0, ChromaSubtype::Enhanced, FocusSystem::None, false);
        assert_eq!(subtype_score(&enhanced, true), MAX_SUBTYPE_SCORE);
        assert_eq!(subtype_score(&enhanced, false), 0);

        let full = format(Dimensions::UHD_4K, 30.0, ChromaSubtype::FullRange, FocusSystem::None, false);
        assert_eq!(subtype_score(&full, true), 2);
        assert_eq!(subtype_score(&full, false), 2);

        let scorer = FormatScorer::default();
        assert!(scorer.score(&enhanced, 0, true).enhanced_subtype_supported);
        assert!(!scorer.score(&enhanced, 0, false).enhanced_subtype_supported);
        assert!(!scorer.score(&full, 0, true).enhanced_subtype_supported);
    }

    #[test]
    fn test_score_breakdown() {
        let mut f = format(
            Dimensions::FHD_1080P,
            60.0,
            ChromaSubtype::FullRange,
            FocusSystem::PhaseDetection,
            false,
        );
        f.hdr_supported = true;

        let scored = FormatScorer::default().score(&f, 3, false);
        assert_eq!(scored.index, 3);
        assert_eq!(scored.dimension_score, 30);
        assert_eq!(scored.binned_score, 5);
        assert_eq!(scored.frame_rate_score, 8);
        assert_eq!(scored.subtype_score, 2);
        assert_eq!(scored.focus_score, 4);
        assert_eq!(scored.score, 30 * 10_000 + 5 * 1_000 + 8 * 100 + 2 * 10 + 4);
        assert!(scored.hdr_supported);
    }

    #[test]
    fn test_unbinned_beats_binned_at_equal_dimensions() {
        let scorer = FormatScorer::default();
        let binned = format(Dimensions::UHD_4K, 60.0, ChromaSubtype::Enhanced, FocusSystem::PhaseDetection, true);
        let plain = format(Dimensions::UHD_4K, 25.0, ChromaSubtype::Other("yuvs".into()), FocusSystem::None, false);
        assert!(scorer.score(&plain, 0, true).score > scorer.score(&binned, 1, true).score);
    }

    fn arb_dimensions() -> impl Strategy<Value = Dimensions> {
        prop_oneof![
            Just(Dimensions::UHD_4K),
            Just(Dimensions::FHD_1080P),
            Just(Dimensions::HD_720P),
            Just(Dimensions::SD_480P),
            (1u32..8000, 1u32..8000).prop_map(|(w, h)| Dimensions::new(w, h)),
        ]
    }

    fn arb_format() -> impl Strategy<Value = FormatDescriptor> {
        let subtype = prop_oneof![
            Just(ChromaSubtype::Enhanced),
            Just(ChromaSubtype::FullRange),
            Just(ChromaSubtype::VideoRange),
        ];
        let focus = prop_oneof![
            Just(FocusSystem::PhaseDetection),
            Just(FocusSystem::ContrastDetection),
            Just(FocusSystem::None),
        ];
        let fps = prop_oneof![Just(30.0), Just(60.0), Just(120.0), Just(240.0), 1.0f64..2000.0];
        (arb_dimensions(), fps, subtype, focus, any::<bool>(), any::<bool>()).prop_map(
            |(dimensions, max_fps, subtype, focus_system, hdr_supported, binned)| FormatDescriptor {
                dimensions,
                frame_rate_range: FrameRateRange::new(1.0, max_fps),
                subtype,
                focus_system,
                hdr_supported,
                binned,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_dimension_dominates_all_lower_criteria(
            a in arb_format(),
            b in arb_format(),
            enhanced in any::<bool>(),
            raw in any::<bool>(),
        ) {
            let policy = if raw { FrameRatePolicy::Raw } else { FrameRatePolicy::Tiered };
            let scorer = FormatScorer::new(policy);
            let sa = scorer.score(&a, 0, enhanced);
            let sb = scorer.score(&b, 1, enhanced);
            if sa.dimension_score > sb.dimension_score {
                prop_assert!(sa.score > sb.score);
            }
            if sa.dimension_score == sb.dimension_score && sa.binned_score > sb.binned_score {
                prop_assert!(sa.score > sb.score);
            }
        }
    }
}
