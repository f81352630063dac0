//! Inverse-mapped warping of sources onto the canvas and feather blending.

use panorama_core::{PixelRect, Placement, Raster, RasterError};

/// One source resampled over its canvas bounds.
#[derive(Clone, Debug)]
pub(crate) struct WarpedTile {
    pub bounds: PixelRect,
    /// Interleaved samples, `bounds.area() * channels`.
    pub values: Vec<f32>,
    /// Feather weight per pixel; zero where the source does not cover the canvas.
    pub weights: Vec<f32>,
}

/// Resample `raster` into the canvas pixels covered by `placement`.
pub(crate) fn warp_source(raster: &Raster, placement: &Placement) -> WarpedTile {
    let bounds = placement.bounds;
    let channels = raster.channels();
    let (w, h) = (raster.width() as f64, raster.height() as f64);
    let mut values = vec![0.0f32; bounds.area() * channels];
    let mut weights = vec![0.0f32; bounds.area()];

    let mut px = vec![0.0f32; channels];
    for (row, y) in (bounds.y0..bounds.y1).enumerate() {
        for (col, x) in (bounds.x0..bounds.x1).enumerate() {
            let Some(p) = placement.source_point(x as f64 + 0.5, y as f64 + 0.5) else {
                continue;
            };
            raster.sample_bilinear(p.x - 0.5, p.y - 0.5, &mut px);
            let i = row * bounds.width() + col;
            values[i * channels..(i + 1) * channels].copy_from_slice(&px);
            weights[i] = feather_weight(p.x, p.y, w, h);
        }
    }

    WarpedTile {
        bounds,
        values,
        weights,
    }
}

/// Distance to the nearest source edge, plus one so border pixels still count.
#[inline]
fn feather_weight(x: f64, y: f64, w: f64, h: f64) -> f32 {
    let d = x.min(y).min(w - x).min(h - y).max(0.0);
    (d + 1.0) as f32
}

/// Blend tiles, in order, into a `width × height` raster.
///
/// A pixel with a single contributor takes its value as is; several
/// contributors are averaged by feather weight. Uncovered pixels stay zero.
pub(crate) fn blend(
    width: usize,
    height: usize,
    channels: usize,
    tiles: &[WarpedTile],
) -> Result<Raster, RasterError> {
    let n = width * height;
    let mut weight_sum = vec![0.0f32; n];
    let mut value_sum = vec![0.0f32; n * channels];
    let mut first = vec![0.0f32; n * channels];
    let mut count = vec![0u32; n];

    for tile in tiles {
        let b = tile.bounds;
        for (row, y) in (b.y0..b.y1).enumerate() {
            for (col, x) in (b.x0..b.x1).enumerate() {
                let ti = row * b.width() + col;
                let wgt = tile.weights[ti];
                if wgt <= 0.0 {
                    continue;
                }
                let ci = y * width + x;
                let src = &tile.values[ti * channels..(ti + 1) * channels];
                if count[ci] == 0 {
                    first[ci * channels..(ci + 1) * channels].copy_from_slice(src);
                }
                count[ci] += 1;
                weight_sum[ci] += wgt;
                for (acc, v) in value_sum[ci * channels..(ci + 1) * channels]
                    .iter_mut()
                    .zip(src)
                {
                    *acc += wgt * v;
                }
            }
        }
    }

    let mut data = vec![0u8; n * channels];
    for ci in 0..n {
        let out = &mut data[ci * channels..(ci + 1) * channels];
        match count[ci] {
            0 => {}
            1 => {
                for (o, v) in out.iter_mut().zip(&first[ci * channels..(ci + 1) * channels]) {
                    *o = to_u8(*v);
                }
            }
            _ => {
                let inv = 1.0 / weight_sum[ci];
                for (o, v) in out
                    .iter_mut()
                    .zip(&value_sum[ci * channels..(ci + 1) * channels])
                {
                    *o = to_u8(v * inv);
                }
            }
        }
    }

    Raster::from_raw(width, height, channels, data)
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_core::Homography;

    fn flat(width: usize, height: usize, v: u8) -> Raster {
        Raster::from_raw(width, height, 1, vec![v; width * height]).expect("raster")
    }

    #[test]
    fn translated_warp_reproduces_pixels() {
        let data: Vec<u8> = (0..20u8).collect();
        let raster = Raster::from_raw(5, 4, 1, data.clone()).expect("raster");
        let placement =
            Placement::new(0, 5, 4, Homography::translation(3.0, 2.0), 10, 8).expect("placement");
        let tile = warp_source(&raster, &placement);
        let out = blend(10, 8, 1, &[tile]).expect("blend");
        for y in 0..4 {
            for x in 0..5 {
                assert_eq!(out.pixel(x + 3, y + 2)[0], data[y * 5 + x]);
            }
        }
        assert_eq!(out.pixel(0, 0)[0], 0);
        assert_eq!(out.pixel(9, 7)[0], 0);
    }

    #[test]
    fn overlapping_tiles_are_weighted() {
        let a = flat(6, 20, 100);
        let b = flat(6, 20, 200);
        let pa = Placement::new(0, 6, 20, Homography::identity(), 9, 20).expect("a");
        let pb = Placement::new(1, 6, 20, Homography::translation(3.0, 0.0), 9, 20).expect("b");
        let tiles = [warp_source(&a, &pa), warp_source(&b, &pb)];
        let out = blend(9, 20, 1, &tiles).expect("blend");

        assert_eq!(out.pixel(0, 10)[0], 100);
        assert_eq!(out.pixel(8, 10)[0], 200);
        // Column 3: a is 2.5 px from its right edge, b 0.5 px from its left.
        assert_eq!(out.pixel(3, 10)[0], 130);
        // Column 5: mirror case.
        assert_eq!(out.pixel(5, 10)[0], 170);
    }

    #[test]
    fn feather_weight_peaks_in_the_middle() {
        assert!(feather_weight(5.0, 5.0, 10.0, 10.0) > feather_weight(1.0, 5.0, 10.0, 10.0));
        assert_eq!(feather_weight(0.5, 5.0, 10.0, 10.0), 1.5);
    }
}
