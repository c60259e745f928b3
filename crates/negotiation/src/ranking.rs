//! Format ranking.

use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::format::FormatDescriptor;
use optica_device_model::lens::LensDescriptor;

use crate::scoring::{FormatScorer, ScoredFormat};

/// Orders a format catalog by score, best first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRanker {
    scorer: FormatScorer,
}

impl FormatRanker {
    pub fn new(scorer: FormatScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &FormatScorer {
        &self.scorer
    }

    /// Rank a bare catalog.
    pub fn rank(
        &self,
        formats: &[FormatDescriptor],
        enhanced_color: bool,
    ) -> OpticaResult<Vec<ScoredFormat>> {
        self.rank_catalog(formats, enhanced_color, "catalog")
    }

    /// Rank the catalog of a lens.
    pub fn rank_lens(
        &self,
        lens: &LensDescriptor,
        enhanced_color: bool,
    ) -> OpticaResult<Vec<ScoredFormat>> {
        self.rank_catalog(&lens.formats, enhanced_color, lens.id.as_str())
    }

    fn rank_catalog(
        &self,
        formats: &[FormatDescriptor],
        enhanced_color: bool,
        label: &str,
    ) -> OpticaResult<Vec<ScoredFormat>> {
        if formats.is_empty() {
            return Err(OpticaError::NoFormatsAvailable {
                lens: label.to_string(),
            });
        }

        let mut ranked: Vec<ScoredFormat> = formats
            .iter()
            .enumerate()
            .map(|(index, format)| self.scorer.score(format, index, enhanced_color))
            .collect();

        // `sort_by` is stable: equal scores keep discovery order.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        tracing::debug!(
            lens = label,
            formats = ranked.len(),
            best_score = ranked[0].score,
            policy = ?self.scorer.policy(),
            "Ranked format catalog"
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optica_common::config::FrameRatePolicy;
    use optica_device_model::format::{ChromaSubtype, Dimensions, FocusSystem, FrameRateRange};

    fn plain(dimensions: Dimensions, max_fps: f64) -> FormatDescriptor {
        FormatDescriptor {
            dimensions,
            frame_rate_range: FrameRateRange::new(1.0, max_fps),
            subtype: ChromaSubtype::VideoRange,
            focus_system: FocusSystem::None,
            hdr_supported: false,
            binned: false,
        }
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        let err = FormatRanker::default().rank(&[], false).unwrap_err();
        assert!(matches!(err, OpticaError::NoFormatsAvailable { .. }));
    }

    #[test]
    fn test_rank_is_descending() {
        let formats = vec![
            plain(Dimensions::SD_480P, 30.0),
            plain(Dimensions::UHD_4K, 30.0),
            plain(Dimensions::HD_720P, 60.0),
            plain(Dimensions::FHD_1080P, 30.0),
        ];
        let ranked = FormatRanker::default().rank(&formats, false).unwrap();
        let order: Vec<_> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_discovery_order_and_are_repeatable() {
        let formats = vec![
            plain(Dimensions::FHD_1080P, 30.0),
            plain(Dimensions::HD_720P, 30.0),
            plain(Dimensions::FHD_1080P, 30.0),
            plain(Dimensions::FHD_1080P, 30.0),
        ];
        let ranker = FormatRanker::new(FormatScorer::new(FrameRatePolicy::Raw));
        let first = ranker.rank(&formats, true).unwrap();
        let second = ranker.rank(&formats, true).unwrap();

        let order: Vec<_> = first.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![0, 2, 3, 1]);
        assert_eq!(first, second);
    }
}
