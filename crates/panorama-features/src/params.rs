use serde::{Deserialize, Serialize};

/// Keypoint detection and description parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbParams {
    /// Upper bound on keypoints per image, shared across levels by area.
    pub n_features: usize,
    /// Number of pyramid levels (including the full-resolution one).
    pub n_levels: usize,
    /// Downscale factor between consecutive levels (> 1).
    pub scale_factor: f32,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Harris `k` used to rank FAST corners.
    pub harris_k: f32,
    /// Radius of the orientation patch; the descriptor pattern fits two pixels inside it.
    pub patch_radius: usize,
    /// Box-filter half-width applied before descriptor sampling.
    pub blur_radius: usize,
    /// Smallest pyramid level side in pixels.
    pub min_level_side: usize,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            n_features: 1500,
            n_levels: 4,
            scale_factor: 1.25,
            fast_threshold: 20,
            harris_k: 0.04,
            patch_radius: 15,
            blur_radius: 2,
            min_level_side: 40,
        }
    }
}

/// Descriptor matching parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Lowe ratio: keep a match only if `best < ratio * second_best`.
    pub ratio: f32,
    /// Absolute Hamming distance cap (out of 256 bits).
    pub max_distance: u32,
    /// Require mutual nearest neighbours.
    pub cross_check: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            max_distance: 80,
            cross_check: true,
        }
    }
}

/// Robust homography estimation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    pub max_iterations: usize,
    /// Inlier threshold on the forward reprojection error, in pixels.
    pub reprojection_threshold: f64,
    /// Desired probability of drawing at least one all-inlier sample.
    pub confidence: f64,
    /// Base RNG seed; mixed with the pair indices per alignment.
    pub seed: u64,
    /// Share of the homography's inliers a similarity or affine model must
    /// keep to replace it.
    pub simpler_model_support: f64,
    /// A simpler model may have at most this multiple of the homography's
    /// RMS residual on the homography inliers.
    pub simpler_model_rms_ratio: f64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            reprojection_threshold: 3.0,
            confidence: 0.995,
            seed: 0x5eed,
            simpler_model_support: 0.95,
            simpler_model_rms_ratio: 1.5,
        }
    }
}

/// Full configuration of a [`crate::FeatureAligner`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerParams {
    pub orb: OrbParams,
    pub matching: MatchParams,
    pub ransac: RansacParams,
    /// Minimum RANSAC inliers for a pair to be accepted.
    pub min_inliers: usize,
    /// Minimum stitch confidence `inliers / (8 + 0.3 * matches)`.
    pub min_confidence: f64,
    /// Largest accepted area scale change between two images (and its reciprocal).
    pub max_scale_change: f64,
}

impl Default for AlignerParams {
    fn default() -> Self {
        Self {
            orb: OrbParams::default(),
            matching: MatchParams::default(),
            ransac: RansacParams::default(),
            min_inliers: 12,
            min_confidence: 0.5,
            max_scale_change: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_keep_defaults() {
        let params: AlignerParams =
            serde_json::from_str(r#"{ "min_inliers": 20, "orb": { "n_features": 500 } }"#)
                .expect("parse");
        assert_eq!(params.min_inliers, 20);
        assert_eq!(params.orb.n_features, 500);
        assert_eq!(params.orb.n_levels, OrbParams::default().n_levels);
        assert_eq!(params.ransac, RansacParams::default());
    }
}
