//! RANSAC homography estimation over point correspondences.
//!
//! The consensus homography is refit on its inliers, then replaced by a
//! similarity or affine fit when the inliers do not support the extra
//! degrees of freedom; narrow overlaps leave the perspective terms
//! unconstrained.

use nalgebra::Point2;
use panorama_core::{
    estimate_affine, estimate_homography, estimate_similarity, homography_from_4pt, Homography,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::RansacParams;

/// Degrees of freedom of the fitted transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionModel {
    Similarity,
    Affine,
    Projective,
}

/// Best model found and its consensus set.
#[derive(Clone, Debug)]
pub struct RansacResult {
    pub homography: Homography,
    pub model: MotionModel,
    /// Indices into the correspondence slices, ascending.
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

const MIN_TRIANGLE_AREA: f64 = 1.0;

/// Residuals below this (pixels) count as an exact fit.
const RMS_FLOOR: f64 = 1e-3;

type LowOrderFit = fn(&[Point2<f64>], &[Point2<f64>]) -> Option<Homography>;

const SIMPLER_MODELS: [(MotionModel, LowOrderFit); 2] = [
    (MotionModel::Similarity, estimate_similarity),
    (MotionModel::Affine, estimate_affine),
];

/// Estimate `dst ~ H * src` robustly.
///
/// Returns `None` when fewer than 4 correspondences are given or no sample
/// produced a usable model.
pub fn ransac_homography(
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    params: &RansacParams,
    seed: u64,
) -> Option<RansacResult> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }

    let threshold_sq = params.reprojection_threshold * params.reprojection_threshold;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<(Homography, Vec<usize>)> = None;
    let mut needed = params.max_iterations;
    let mut iterations = 0usize;

    while iterations < needed.min(params.max_iterations) {
        iterations += 1;
        let sample = rand::seq::index::sample(&mut rng, n, 4).into_vec();
        let s: [Point2<f64>; 4] = std::array::from_fn(|k| src[sample[k]]);
        let d: [Point2<f64>; 4] = std::array::from_fn(|k| dst[sample[k]]);
        if is_degenerate_sample(&s) || is_degenerate_sample(&d) {
            continue;
        }
        let Some(h) = homography_from_4pt(&s, &d) else {
            continue;
        };

        let inliers = consensus(&h, src, dst, threshold_sq);
        let best_len = best.as_ref().map_or(0, |(_, i)| i.len());
        if inliers.len() > best_len {
            needed = adaptive_iterations(inliers.len(), n, params.confidence);
            best = Some((h, inliers));
        }
    }

    let (mut homography, mut inliers) = best?;

    if inliers.len() > 4 {
        let s: Vec<_> = inliers.iter().map(|&i| src[i]).collect();
        let d: Vec<_> = inliers.iter().map(|&i| dst[i]).collect();
        if let Some(refit) = estimate_homography(&s, &d) {
            let refit_inliers = consensus(&refit, src, dst, threshold_sq);
            if refit_inliers.len() >= inliers.len() {
                homography = refit;
                inliers = refit_inliers;
            }
        }
    }

    let (model, homography, inliers) =
        select_model(homography, inliers, src, dst, params, threshold_sq);

    Some(RansacResult {
        homography,
        model,
        inliers,
        iterations,
    })
}

/// Simplest of similarity, affine and projective that the inliers support.
fn select_model(
    homography: Homography,
    inliers: Vec<usize>,
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    params: &RansacParams,
    threshold_sq: f64,
) -> (MotionModel, Homography, Vec<usize>) {
    let s: Vec<_> = inliers.iter().map(|&i| src[i]).collect();
    let d: Vec<_> = inliers.iter().map(|&i| dst[i]).collect();
    let Some(projective_rms) = rms_residual(&homography, &s, &d) else {
        return (MotionModel::Projective, homography, inliers);
    };
    let required = params.simpler_model_support * inliers.len() as f64;

    for (model, fit) in SIMPLER_MODELS {
        let Some(mut candidate) = fit(&s, &d) else {
            continue;
        };
        let mut support = consensus(&candidate, src, dst, threshold_sq);
        let cs: Vec<_> = support.iter().map(|&i| src[i]).collect();
        let cd: Vec<_> = support.iter().map(|&i| dst[i]).collect();
        if let Some(refit) = fit(&cs, &cd) {
            let refit_support = consensus(&refit, src, dst, threshold_sq);
            if refit_support.len() >= support.len() {
                candidate = refit;
                support = refit_support;
            }
        }

        let Some(rms) = rms_residual(&candidate, &s, &d) else {
            continue;
        };
        if support.len() as f64 >= required
            && rms <= params.simpler_model_rms_ratio * projective_rms + RMS_FLOOR
        {
            return (model, candidate, support);
        }
    }
    (MotionModel::Projective, homography, inliers)
}

fn rms_residual(h: &Homography, src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<f64> {
    if src.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for (s, d) in src.iter().zip(dst) {
        sum += (h.apply_checked(*s)? - *d).norm_squared();
    }
    Some((sum / src.len() as f64).sqrt())
}

fn consensus(
    h: &Homography,
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    threshold_sq: f64,
) -> Vec<usize> {
    src.iter()
        .zip(dst)
        .enumerate()
        .filter_map(|(i, (s, d))| {
            let p = h.apply_checked(*s)?;
            ((p - *d).norm_squared() <= threshold_sq).then_some(i)
        })
        .collect()
}

/// Iterations needed to draw an all-inlier 4-sample with probability `confidence`.
fn adaptive_iterations(inliers: usize, total: usize, confidence: f64) -> usize {
    let w = inliers as f64 / total as f64;
    let p_good = w.powi(4);
    if p_good >= 1.0 - f64::EPSILON {
        return 1;
    }
    if p_good <= f64::EPSILON {
        return usize::MAX;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if k.is_finite() {
        k.ceil().max(1.0) as usize
    } else {
        usize::MAX
    }
}

/// Any three of the four points (nearly) collinear.
fn is_degenerate_sample(p: &[Point2<f64>; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(a, b, c)| {
        let ab = p[b] - p[a];
        let ac = p[c] - p[a];
        (ab.x * ac.y - ab.y * ac.x).abs() * 0.5 < MIN_TRIANGLE_AREA
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn grid_points() -> Vec<Point2<f64>> {
        let mut pts = Vec::new();
        for j in 0..6 {
            for i in 0..8 {
                pts.push(Point2::new(20.0 + 30.0 * i as f64, 15.0 + 25.0 * j as f64));
            }
        }
        pts
    }

    #[test]
    fn recovers_homography_with_outliers() {
        let truth = Homography::new(Matrix3::new(
            1.02, 0.03, 40.0, //
            -0.02, 0.99, -12.0, //
            1e-5, -2e-5, 1.0,
        ));
        let src = grid_points();
        let mut dst: Vec<_> = src.iter().map(|p| truth.apply(*p)).collect();
        // Corrupt every fifth correspondence.
        for (k, d) in dst.iter_mut().enumerate() {
            if k % 5 == 0 {
                d.x += 35.0 + k as f64;
                d.y -= 20.0;
            }
        }

        let result =
            ransac_homography(&src, &dst, &RansacParams::default(), 7).expect("ransac result");
        let expected_inliers: Vec<usize> = (0..src.len()).filter(|k| k % 5 != 0).collect();
        assert_eq!(result.inliers, expected_inliers);
        assert_eq!(result.model, MotionModel::Projective);

        for p in &src {
            let a = result.homography.apply(*p);
            let b = truth.apply(*p);
            assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn same_seed_same_result() {
        let src = grid_points();
        let dst: Vec<_> = src
            .iter()
            .enumerate()
            .map(|(k, p)| Point2::new(p.x + 5.0 + (k % 3) as f64, p.y - 2.0))
            .collect();
        let a = ransac_homography(&src, &dst, &RansacParams::default(), 99).expect("a");
        let b = ransac_homography(&src, &dst, &RansacParams::default(), 99).expect("b");
        assert_eq!(a.inliers, b.inliers);
        assert_eq!(a.homography, b.homography);
    }

    #[test]
    fn too_few_or_collinear_points_fail() {
        let line: Vec<_> = (0..10).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(ransac_homography(&line[..3], &line[..3], &RansacParams::default(), 1).is_none());
        assert!(ransac_homography(&line, &line, &RansacParams::default(), 1).is_none());
    }

    #[test]
    fn adaptive_iterations_shrink_with_inlier_ratio() {
        assert_eq!(adaptive_iterations(10, 10, 0.995), 1);
        let half = adaptive_iterations(50, 100, 0.995);
        let most = adaptive_iterations(90, 100, 0.995);
        assert!(most < half, "{most} vs {half}");
        assert_eq!(adaptive_iterations(0, 100, 0.995), usize::MAX);
    }

    #[test]
    fn narrow_translated_strip_extrapolates_as_similarity() {
        use rand::Rng;

        // Matches only inside a 60 px strip, shifted by (-240, 0) with sub-pixel noise.
        let mut rng = StdRng::seed_from_u64(3);
        let src: Vec<_> = (0..150)
            .map(|_| Point2::new(rng.random_range(240.0..300.0), rng.random_range(0.0..240.0)))
            .collect();
        let dst: Vec<_> = src
            .iter()
            .map(|p| {
                Point2::new(
                    p.x - 240.0 + rng.random_range(-0.7..0.7),
                    p.y + rng.random_range(-0.7..0.7),
                )
            })
            .collect();

        let result = ransac_homography(&src, &dst, &RansacParams::default(), 11).expect("fit");
        assert_eq!(result.model, MotionModel::Similarity);
        assert_eq!(result.inliers.len(), src.len());
        for (x, y) in [(0.0, 0.0), (0.0, 240.0), (300.0, 0.0), (300.0, 240.0)] {
            let p = result.homography.apply(Point2::new(x, y));
            assert!(
                (p.x - (x - 240.0)).abs() < 1.0 && (p.y - y).abs() < 1.0,
                "({x}, {y}) -> ({}, {})",
                p.x,
                p.y
            );
        }
    }
}
