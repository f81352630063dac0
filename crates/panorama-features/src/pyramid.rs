//! Scale pyramid and smoothing used by the detector and descriptor.

use panorama_core::{sample_bilinear_u8, GrayImage};

/// One pyramid level.
#[derive(Clone, Debug)]
pub(crate) struct Level {
    pub octave: usize,
    /// Level-0 pixels per level pixel.
    pub scale: f64,
    pub image: GrayImage,
    /// Box-smoothed copy for descriptor sampling.
    pub smoothed: GrayImage,
}

/// Build a cascaded pyramid; stops early once a level would drop below `min_side`.
pub(crate) fn build_pyramid(
    base: &GrayImage,
    n_levels: usize,
    scale_factor: f32,
    blur_radius: usize,
    min_side: usize,
) -> Vec<Level> {
    let mut levels = Vec::with_capacity(n_levels.max(1));
    let mut scale = 1.0f64;
    let mut current = base.clone();

    for octave in 0..n_levels.max(1) {
        if octave > 0 {
            let Some(next) = downscale(&current, scale_factor) else {
                break;
            };
            if next.width < min_side || next.height < min_side {
                break;
            }
            scale *= scale_factor as f64;
            current = next;
        }
        let smoothed = box_blur(&current, blur_radius);
        levels.push(Level {
            octave,
            scale,
            image: current.clone(),
            smoothed,
        });
    }

    levels
}

/// Bilinear downscale by `factor` (> 1).
///
/// Level pixel `x` samples the parent at `(x + 0.5) * factor - 0.5`, so
/// continuous coordinates map by a pure scale between levels.
fn downscale(src: &GrayImage, factor: f32) -> Option<GrayImage> {
    if !(factor > 1.0) {
        return None;
    }
    let width = (src.width as f32 / factor).floor() as usize;
    let height = (src.height as f32 / factor).floor() as usize;
    if width == 0 || height == 0 {
        return None;
    }

    let view = src.view();
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let sy = (y as f32 + 0.5) * factor - 0.5;
        for x in 0..width {
            let sx = (x as f32 + 0.5) * factor - 0.5;
            data.push(sample_bilinear_u8(&view, sx, sy));
        }
    }
    Some(GrayImage {
        width,
        height,
        data,
    })
}

/// Separable box filter of half-width `radius`, clamping at the borders.
pub(crate) fn box_blur(src: &GrayImage, radius: usize) -> GrayImage {
    if radius == 0 {
        return src.clone();
    }
    let (w, h) = (src.width, src.height);
    let r = radius as isize;
    let norm = (2 * radius + 1) as u32;

    let mut tmp = vec![0u8; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0u32;
            for dx in -r..=r {
                let sx = (x as isize + dx).clamp(0, w as isize - 1) as usize;
                acc += row[sx] as u32;
            }
            tmp[y * w + x] = ((acc + norm / 2) / norm) as u8;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for dy in -r..=r {
                let sy = (y as isize + dy).clamp(0, h as isize - 1) as usize;
                acc += tmp[sy * w + x] as u32;
            }
            out[y * w + x] = ((acc + norm / 2) / norm) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}
