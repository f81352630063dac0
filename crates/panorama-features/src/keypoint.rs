//! Oriented FAST keypoints over a scale pyramid.
//!
//! Per level:
//! 1. FAST-9 segment test on the 16-pixel Bresenham circle of radius 3.
//! 2. 3×3 non-maximum suppression on the FAST score.
//! 3. Harris response ranking; keep the level's share of `n_features`.
//! 4. Orientation from the intensity centroid of a circular patch.

use nalgebra::Point2;
use panorama_core::GrayImage;

use crate::descriptor::Descriptor;
use crate::pyramid::Level;
use crate::OrbParams;

/// A detected, described keypoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Keypoint {
    /// Position in level-0 continuous pixel coordinates (pixel `i` spans `[i, i + 1)`).
    pub position: Point2<f64>,
    /// Pyramid level the keypoint was found on.
    pub octave: usize,
    /// Level-0 pixels per level pixel.
    pub scale: f64,
    /// Patch orientation in radians.
    pub angle: f32,
    /// Harris response at detection scale.
    pub response: f32,
    pub descriptor: Descriptor,
}

/// Keypoint candidate on a single level, before description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LevelCorner {
    pub x: usize,
    pub y: usize,
    pub response: f32,
    pub angle: f32,
}

const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const ARC_LENGTH: usize = 9;

/// Detect oriented corners on one level, keeping at most `max_corners`.
///
/// Only pixels at least `margin` away from the border are considered so the
/// descriptor patch always fits.
pub(crate) fn detect_level(
    level: &Level,
    params: &OrbParams,
    margin: usize,
    max_corners: usize,
) -> Vec<LevelCorner> {
    let img = &level.image;
    let margin = margin.max(3);
    if max_corners == 0 || img.width <= 2 * margin || img.height <= 2 * margin {
        return Vec::new();
    }

    let scores = fast_scores(img, params.fast_threshold, margin);
    let mut corners = Vec::new();
    for y in margin..img.height - margin {
        for x in margin..img.width - margin {
            let s = scores[y * img.width + x];
            if s > 0.0 && is_local_max(&scores, img.width, x, y, s) {
                corners.push(LevelCorner {
                    x,
                    y,
                    response: harris_response(img, x, y, params.harris_k),
                    angle: 0.0,
                });
            }
        }
    }

    // Raster order is the tie-break, which keeps detection deterministic.
    corners.sort_by(|a, b| {
        b.response
            .total_cmp(&a.response)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });
    corners.truncate(max_corners);

    let radius = params.patch_radius;
    for c in &mut corners {
        c.angle = intensity_centroid_angle(img, c.x, c.y, radius);
    }
    corners
}

/// FAST score map: zero for non-corners, otherwise the summed contrast of
/// the winning class on the circle.
fn fast_scores(img: &GrayImage, threshold: u8, margin: usize) -> Vec<f32> {
    let w = img.width;
    let mut scores = vec![0.0f32; w * img.height];
    let t = threshold as i16;

    for y in margin..img.height - margin {
        for x in margin..w - margin {
            let p = img.get(x, y) as i16;
            let mut ring = [0i16; 16];
            for (k, &(dx, dy)) in CIRCLE.iter().enumerate() {
                ring[k] = img.get((x as isize + dx) as usize, (y as isize + dy) as usize) as i16;
            }

            // Any 9-arc covers at least two of the four compass points.
            let compass = [ring[0], ring[4], ring[8], ring[12]];
            let bright = compass.iter().filter(|&&v| v > p + t).count();
            let dark = compass.iter().filter(|&&v| v < p - t).count();
            if bright < 2 && dark < 2 {
                continue;
            }

            let is_bright = has_arc(&ring, |v| v > p + t);
            let is_dark = has_arc(&ring, |v| v < p - t);
            if !is_bright && !is_dark {
                continue;
            }

            let mut bright_sum = 0i32;
            let mut dark_sum = 0i32;
            for &v in &ring {
                if v > p + t {
                    bright_sum += (v - p - t) as i32;
                } else if v < p - t {
                    dark_sum += (p - t - v) as i32;
                }
            }
            let score = match (is_bright, is_dark) {
                (true, false) => bright_sum,
                (false, true) => dark_sum,
                _ => bright_sum.max(dark_sum),
            };
            scores[y * w + x] = score.max(1) as f32;
        }
    }
    scores
}

fn has_arc(ring: &[i16; 16], pred: impl Fn(i16) -> bool) -> bool {
    let mut run = 0usize;
    for k in 0..(16 + ARC_LENGTH - 1) {
        if pred(ring[k % 16]) {
            run += 1;
            if run >= ARC_LENGTH {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Strict maximum against earlier neighbours, non-strict against later ones,
/// so plateaus keep exactly their first pixel in raster order.
fn is_local_max(scores: &[f32], w: usize, x: usize, y: usize, s: f32) -> bool {
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let n = scores[(y as isize + dy) as usize * w + (x as isize + dx) as usize];
            let earlier = dy < 0 || (dy == 0 && dx < 0);
            if (earlier && n >= s) || (!earlier && n > s) {
                return false;
            }
        }
    }
    true
}

/// Harris corner response over a 7×7 window of central-difference gradients.
fn harris_response(img: &GrayImage, x: usize, y: usize, k: f32) -> f32 {
    const R: isize = 3;
    let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
    let w = img.width as isize;
    let h = img.height as isize;
    for dy in -R..=R {
        for dx in -R..=R {
            let px = (x as isize + dx).clamp(1, w - 2) as usize;
            let py = (y as isize + dy).clamp(1, h - 2) as usize;
            let gx = (img.get(px + 1, py) as f32 - img.get(px - 1, py) as f32) * 0.5;
            let gy = (img.get(px, py + 1) as f32 - img.get(px, py - 1) as f32) * 0.5;
            sxx += gx * gx;
            syy += gy * gy;
            sxy += gx * gy;
        }
    }
    let det = sxx * syy - sxy * sxy;
    let trace = sxx + syy;
    det - k * trace * trace
}

/// Orientation of the patch centroid relative to `(x, y)`.
fn intensity_centroid_angle(img: &GrayImage, x: usize, y: usize, radius: usize) -> f32 {
    let r = radius as isize;
    let r2 = r * r;
    let (mut m10, mut m01) = (0.0f64, 0.0f64);
    for dy in -r..=r {
        let py = y as isize + dy;
        if py < 0 || py >= img.height as isize {
            continue;
        }
        for dx in -r..=r {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let px = x as isize + dx;
            if px < 0 || px >= img.width as isize {
                continue;
            }
            let v = img.get(px as usize, py as usize) as f64;
            m10 += dx as f64 * v;
            m01 += dy as f64 * v;
        }
    }
    m01.atan2(m10) as f32
}
