//! Credit pricing rules.
//!
//! Image pricing is a fixed matrix over (model, resolution level,
//! generation type); the matrix is injected configuration so pricing can
//! change per environment without touching the rule engine. Video
//! pricing is per-second with a 1080p surcharge, and extension is a
//! flat rate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::plan::PlanTier;
use crate::video_params::{VideoDuration, VideoResolution};

/* --------------------------------------------------------------------------
Video pricing constants
-------------------------------------------------------------------------- */

/// Base video generation price in credits per second (720p).
pub const VIDEO_COST_PER_SECOND: u32 = 10;

/// Flat price of a video extension, in credits.
pub const VIDEO_EXTENSION_COST: u32 = 40;

/* --------------------------------------------------------------------------
Image pricing enums
-------------------------------------------------------------------------- */

/// Image generation model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageModel {
    Standard,
    Ultra,
}

/// Output resolution level for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionLevel {
    #[serde(rename = "1k")]
    R1k,
    #[serde(rename = "2k")]
    R2k,
    #[serde(rename = "4k")]
    R4k,
}

/// Whether the request is seeded with reference images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationType {
    TextToImage,
    ImageToImage,
}

/* --------------------------------------------------------------------------
Cost matrix
-------------------------------------------------------------------------- */

/// Immutable per-image price table.
///
/// Not every (model, level) cell exists -- the standard model has no 4k
/// output. Image-to-image always costs at least as much as
/// text-to-image for the same cell; [`CostMatrix::new`] enforces this
/// so a bad configuration fails loudly at startup instead of
/// silently undercharging.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    cells: BTreeMap<(ImageModel, ResolutionLevel, GenerationType), u32>,
}

impl CostMatrix {
    /// Build a matrix from explicit cells.
    ///
    /// # Panics
    ///
    /// Panics if any (model, level) has an image-to-image price below
    /// its text-to-image price.
    pub fn new(
        cells: impl IntoIterator<Item = ((ImageModel, ResolutionLevel, GenerationType), u32)>,
    ) -> Self {
        let matrix = Self {
            cells: cells.into_iter().collect(),
        };
        for (&(model, level, gen_type), &price) in &matrix.cells {
            if gen_type == GenerationType::ImageToImage {
                if let Some(&t2i) = matrix
                    .cells
                    .get(&(model, level, GenerationType::TextToImage))
                {
                    assert!(
                        price >= t2i,
                        "image-to-image price {price} below text-to-image price {t2i} for {model:?}/{level:?}"
                    );
                }
            }
        }
        matrix
    }

    /// Price of a single image, or `None` if the model does not offer
    /// the requested resolution level.
    pub fn cost_per_image(
        &self,
        model: ImageModel,
        level: ResolutionLevel,
        gen_type: GenerationType,
    ) -> Option<u32> {
        self.cells.get(&(model, level, gen_type)).copied()
    }

    /// Whether a model offers the given resolution level at all.
    pub fn supports(&self, model: ImageModel, level: ResolutionLevel) -> bool {
        self.cells
            .contains_key(&(model, level, GenerationType::TextToImage))
    }
}

impl Default for CostMatrix {
    /// Production price table.
    fn default() -> Self {
        use GenerationType::{ImageToImage, TextToImage};
        use ImageModel::{Standard, Ultra};
        use ResolutionLevel::{R1k, R2k, R4k};

        Self::new([
            // Standard model: 1k and 2k only.
            ((Standard, R1k, TextToImage), 1),
            ((Standard, R1k, ImageToImage), 2),
            ((Standard, R2k, TextToImage), 1),
            ((Standard, R2k, ImageToImage), 2),
            // Ultra model: full range.
            ((Ultra, R1k, TextToImage), 2),
            ((Ultra, R1k, ImageToImage), 3),
            ((Ultra, R2k, TextToImage), 3),
            ((Ultra, R2k, ImageToImage), 4),
            ((Ultra, R4k, TextToImage), 4),
            ((Ultra, R4k, ImageToImage), 6),
        ])
    }
}

/// Total price of a batch of `count` images at `per_image` credits each.
pub fn total_cost(per_image: u32, count: u32) -> u64 {
    u64::from(per_image) * u64::from(count)
}

/* --------------------------------------------------------------------------
Video pricing
-------------------------------------------------------------------------- */

/// Price of a video generation in credits.
///
/// Per-second base rate with a 1.5x surcharge for 1080p output.
pub fn video_generation_cost(resolution: VideoResolution, duration: VideoDuration) -> u32 {
    let base = duration.as_secs() * VIDEO_COST_PER_SECOND;
    match resolution {
        VideoResolution::P720 => base,
        VideoResolution::P1080 => base * 3 / 2,
    }
}

/* --------------------------------------------------------------------------
Subscription credit schedule
-------------------------------------------------------------------------- */

/// Monthly credit allotment per plan tier.
///
/// Injected into the monthly-activation job so environments (and tests)
/// can run with their own numbers.
#[derive(Debug, Clone)]
pub struct MonthlyCreditSchedule {
    pub basic: i64,
    pub pro: i64,
    pub max: i64,
}

impl MonthlyCreditSchedule {
    pub fn for_tier(&self, tier: PlanTier) -> i64 {
        match tier {
            PlanTier::Basic => self.basic,
            PlanTier::Pro => self.pro,
            PlanTier::Max => self.max,
        }
    }
}

impl Default for MonthlyCreditSchedule {
    /// Production allotments.
    fn default() -> Self {
        Self {
            basic: 150,
            pro: 800,
            max: 2000,
        }
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    // -- CostMatrix --

    #[test]
    fn image_to_image_never_cheaper_than_text_to_image() {
        let matrix = CostMatrix::default();
        for model in [ImageModel::Standard, ImageModel::Ultra] {
            for level in [ResolutionLevel::R1k, ResolutionLevel::R2k, ResolutionLevel::R4k] {
                let t2i = matrix.cost_per_image(model, level, GenerationType::TextToImage);
                let i2i = matrix.cost_per_image(model, level, GenerationType::ImageToImage);
                match (t2i, i2i) {
                    (Some(t), Some(i)) => assert!(i >= t, "{model:?}/{level:?}"),
                    (None, None) => {}
                    other => panic!("half-configured cell {model:?}/{level:?}: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn standard_model_has_no_4k() {
        let matrix = CostMatrix::default();
        assert!(!matrix.supports(ImageModel::Standard, ResolutionLevel::R4k));
        assert_eq!(
            matrix.cost_per_image(
                ImageModel::Standard,
                ResolutionLevel::R4k,
                GenerationType::TextToImage
            ),
            None
        );
    }

    #[test]
    fn ultra_model_supports_all_levels() {
        let matrix = CostMatrix::default();
        for level in [ResolutionLevel::R1k, ResolutionLevel::R2k, ResolutionLevel::R4k] {
            assert!(matrix.supports(ImageModel::Ultra, level));
        }
    }

    #[test]
    fn lookup_is_deterministic() {
        let matrix = CostMatrix::default();
        let a = matrix.cost_per_image(
            ImageModel::Standard,
            ResolutionLevel::R1k,
            GenerationType::TextToImage,
        );
        let b = matrix.cost_per_image(
            ImageModel::Standard,
            ResolutionLevel::R1k,
            GenerationType::TextToImage,
        );
        assert_eq!(a, b);
        assert_eq!(a, Some(1));
    }

    #[test]
    #[should_panic(expected = "below text-to-image")]
    fn inverted_cell_rejected_at_construction() {
        CostMatrix::new([
            (
                (ImageModel::Standard, ResolutionLevel::R1k, GenerationType::TextToImage),
                5,
            ),
            (
                (ImageModel::Standard, ResolutionLevel::R1k, GenerationType::ImageToImage),
                2,
            ),
        ]);
    }

    #[test]
    fn batch_cost_is_linear() {
        assert_eq!(total_cost(2, 1), 2);
        assert_eq!(total_cost(2, 9), 18);
        assert_eq!(total_cost(0, 9), 0);
    }

    // -- video pricing --

    #[test]
    fn video_cost_720p_is_per_second() {
        assert_eq!(
            video_generation_cost(VideoResolution::P720, VideoDuration::Secs4),
            40
        );
        assert_eq!(
            video_generation_cost(VideoResolution::P720, VideoDuration::Secs8),
            80
        );
    }

    #[test]
    fn video_cost_1080p_carries_surcharge() {
        assert_eq!(
            video_generation_cost(VideoResolution::P1080, VideoDuration::Secs4),
            60
        );
        assert_eq!(
            video_generation_cost(VideoResolution::P1080, VideoDuration::Secs8),
            120
        );
    }

    // -- monthly schedule --

    #[test]
    fn production_schedule_values() {
        let schedule = MonthlyCreditSchedule::default();
        assert_eq!(schedule.for_tier(PlanTier::Basic), 150);
        assert_eq!(schedule.for_tier(PlanTier::Pro), 800);
        assert_eq!(schedule.for_tier(PlanTier::Max), 2000);
    }
}
