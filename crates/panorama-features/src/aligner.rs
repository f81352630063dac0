use log::debug;
use nalgebra::Point2;
use panorama_core::{project_corners, Homography, SourceImage};
use serde::{Deserialize, Serialize};

use crate::descriptor::{BriefPattern, Descriptor};
use crate::keypoint::{detect_level, Keypoint};
use crate::matcher::match_descriptors;
use crate::pyramid::build_pyramid;
use crate::ransac::ransac_homography;
use crate::{AlignError, AlignerParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Keypoints of one source image, reusable across every pair it takes part in.
#[derive(Clone, Debug)]
pub struct ImageFeatures {
    /// `SourceImage::index` of the described image.
    pub source: usize,
    pub width: usize,
    pub height: usize,
    pub keypoints: Vec<Keypoint>,
}

impl ImageFeatures {
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.keypoints.iter().map(|k| k.descriptor).collect()
    }
}

/// Accepted alignment of one image pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairwiseTransform {
    pub from: usize,
    pub to: usize,
    /// Maps `from` pixel coordinates into `to` pixel coordinates.
    pub homography: Homography,
    pub matches: usize,
    pub inliers: usize,
    /// `inliers / (8 + 0.3 * matches)`.
    pub confidence: f64,
}

impl PairwiseTransform {
    /// The same alignment seen from the other image.
    pub fn reversed(&self) -> Option<Self> {
        Some(Self {
            from: self.to,
            to: self.from,
            homography: self.homography.inverse()?,
            ..self.clone()
        })
    }
}

/// Stitch confidence of a pair with `inliers` consistent out of `matches`.
pub fn stitch_confidence(inliers: usize, matches: usize) -> f64 {
    inliers as f64 / (8.0 + 0.3 * matches as f64)
}

/// Pairwise feature-based aligner.
#[derive(Clone, Debug)]
pub struct FeatureAligner {
    params: AlignerParams,
    pattern: BriefPattern,
}

impl Default for FeatureAligner {
    fn default() -> Self {
        Self::new(AlignerParams::default())
    }
}

impl FeatureAligner {
    pub fn new(params: AlignerParams) -> Self {
        let pattern = BriefPattern::new(pattern_radius(params.orb.patch_radius));
        Self { params, pattern }
    }

    pub fn params(&self) -> &AlignerParams {
        &self.params
    }

    /// Detect and describe keypoints of `image`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(source = image.index()))
    )]
    pub fn extract(&self, image: &SourceImage) -> ImageFeatures {
        let orb = &self.params.orb;
        let gray = image.raster().to_gray();
        let levels = build_pyramid(
            &gray,
            orb.n_levels,
            orb.scale_factor,
            orb.blur_radius,
            orb.min_level_side,
        );

        let areas: Vec<usize> = levels
            .iter()
            .map(|l| l.image.width * l.image.height)
            .collect();
        let total_area: usize = areas.iter().sum();
        let margin = orb.patch_radius.max(3);

        let mut keypoints = Vec::new();
        for (level, area) in levels.iter().zip(&areas) {
            let quota = if total_area == 0 {
                0
            } else {
                orb.n_features * area / total_area
            };
            for corner in detect_level(level, orb, margin, quota) {
                let descriptor = self.pattern.describe(&level.smoothed, &corner);
                keypoints.push(Keypoint {
                    position: Point2::new(
                        (corner.x as f64 + 0.5) * level.scale,
                        (corner.y as f64 + 0.5) * level.scale,
                    ),
                    octave: level.octave,
                    scale: level.scale,
                    angle: corner.angle,
                    response: corner.response,
                    descriptor,
                });
            }
        }

        debug!(
            "image {}: {} keypoints over {} levels",
            image.index(),
            keypoints.len(),
            levels.len()
        );
        ImageFeatures {
            source: image.index(),
            width: image.width(),
            height: image.height(),
            keypoints,
        }
    }

    /// Estimate the homography taking `from` pixels into `to` pixels.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, from, to), fields(from = from.source, to = to.source))
    )]
    pub fn align(
        &self,
        from: &ImageFeatures,
        to: &ImageFeatures,
    ) -> Result<PairwiseTransform, AlignError> {
        let (fi, ti) = (from.source, to.source);
        let insufficient = |matches: usize, inliers: usize| AlignError::InsufficientOverlap {
            from: fi,
            to: ti,
            matches,
            inliers,
        };

        let matches = match_descriptors(
            &from.descriptors(),
            &to.descriptors(),
            &self.params.matching,
        );
        if matches.len() < 4 {
            return Err(insufficient(matches.len(), 0));
        }

        let src: Vec<_> = matches
            .iter()
            .map(|m| from.keypoints[m.query].position)
            .collect();
        let dst: Vec<_> = matches
            .iter()
            .map(|m| to.keypoints[m.train].position)
            .collect();

        let seed = pair_seed(self.params.ransac.seed, fi, ti);
        let Some(fit) = ransac_homography(&src, &dst, &self.params.ransac, seed) else {
            return Err(insufficient(matches.len(), 0));
        };

        let inliers = fit.inliers.len();
        let confidence = stitch_confidence(inliers, matches.len());
        debug!(
            "pair {fi}->{ti}: {} matches, {inliers} inliers, confidence {confidence:.2}, {:?} model, {} iterations",
            matches.len(),
            fit.model,
            fit.iterations
        );
        if inliers < self.params.min_inliers.max(4) || confidence < self.params.min_confidence {
            return Err(insufficient(matches.len(), inliers));
        }

        if !is_plausible(&fit.homography, from, self.params.max_scale_change) {
            return Err(AlignError::DegenerateTransform { from: fi, to: ti });
        }

        Ok(PairwiseTransform {
            from: fi,
            to: ti,
            homography: fit.homography,
            matches: matches.len(),
            inliers,
            confidence,
        })
    }

    /// Extract both images and align them.
    pub fn align_images(
        &self,
        from: &SourceImage,
        to: &SourceImage,
    ) -> Result<PairwiseTransform, AlignError> {
        self.align(&self.extract(from), &self.extract(to))
    }
}

fn pattern_radius(patch_radius: usize) -> f32 {
    (patch_radius.max(5) - 2) as f32
}

/// Per-pair RNG seed, independent of scheduling order.
fn pair_seed(base: u64, from: usize, to: usize) -> u64 {
    let mut z = base ^ (((from as u64) << 32) | to as u64);
    // splitmix64 finaliser
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// The warped `from` raster must stay a forward-facing quadrilateral whose
/// area changes by at most `max_scale_change` either way.
fn is_plausible(h: &Homography, from: &ImageFeatures, max_scale_change: f64) -> bool {
    let Some(q) = project_corners(h, from.width, from.height) else {
        return false;
    };
    let mut twice_area = 0.0;
    for k in 0..4 {
        let (a, b) = (q[k], q[(k + 1) % 4]);
        twice_area += a.x * b.y - b.x * a.y;
    }
    let ratio = 0.5 * twice_area / (from.width * from.height) as f64;
    let max = max_scale_change.max(1.0);
    ratio.is_finite() && ratio >= 1.0 / max && ratio <= max
}
