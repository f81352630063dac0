/// Errors raised when wrapping raw pixel buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("raster has zero size (width={width}, height={height})")]
    ZeroSize { width: usize, height: usize },

    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),

    #[error("invalid raster buffer length (expected {expected} bytes, got {got})")]
    BufferLength { expected: usize, got: usize },
}

/// Owned 8-bit raster, row-major with interleaved channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap a raw buffer of `width * height * channels` bytes.
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::ZeroSize { width, height });
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(RasterError::UnsupportedChannels(channels));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(RasterError::ZeroSize { width, height })?;
        if data.len() != expected {
            return Err(RasterError::BufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Black raster of the given shape.
    pub fn zeros(width: usize, height: usize, channels: usize) -> Result<Self, RasterError> {
        Self::from_raw(
            width,
            height,
            channels,
            vec![0u8; width.saturating_mul(height).saturating_mul(channels)],
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of pixel `(x, y)`. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let start = (y * self.width + x) * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Bilinear sample at continuous index coordinates, clamping to the border.
    ///
    /// `out` must hold at least `channels` values.
    pub fn sample_bilinear(&self, x: f64, y: f64, out: &mut [f32]) {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = (x - x0 as f64) as f32;
        let fy = (y - y0 as f64) as f32;

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        for c in 0..self.channels {
            let a = p00[c] as f32 + fx * (p10[c] as f32 - p00[c] as f32);
            let b = p01[c] as f32 + fx * (p11[c] as f32 - p01[c] as f32);
            out[c] = a + fy * (b - a);
        }
    }

    /// Luma conversion (BT.601 weights); alpha is ignored.
    pub fn to_gray(&self) -> GrayImage {
        let mut data = Vec::with_capacity(self.width * self.height);
        match self.channels {
            1 => data.extend_from_slice(&self.data),
            _ => {
                for px in self.data.chunks_exact(self.channels) {
                    let l = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                    data.push(l.round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_bad_buffers() {
        assert_eq!(
            Raster::from_raw(0, 4, 3, Vec::new()),
            Err(RasterError::ZeroSize {
                width: 0,
                height: 4
            })
        );
        assert_eq!(
            Raster::from_raw(2, 2, 2, vec![0; 8]),
            Err(RasterError::UnsupportedChannels(2))
        );
        assert_eq!(
            Raster::from_raw(2, 2, 3, vec![0; 11]),
            Err(RasterError::BufferLength {
                expected: 12,
                got: 11
            })
        );
    }

    #[test]
    fn bilinear_interpolates_and_clamps() {
        let r = Raster::from_raw(2, 1, 1, vec![0, 100]).expect("raster");
        let mut out = [0.0f32; 1];
        r.sample_bilinear(0.5, 0.0, &mut out);
        assert!((out[0] - 50.0).abs() < 1e-4);
        r.sample_bilinear(-3.0, 7.0, &mut out);
        assert_eq!(out[0], 0.0);
        r.sample_bilinear(9.0, 0.0, &mut out);
        assert_eq!(out[0], 100.0);
    }

    #[test]
    fn gray_conversion_uses_luma_weights() {
        let r = Raster::from_raw(2, 1, 3, vec![255, 0, 0, 0, 255, 0]).expect("raster");
        let g = r.to_gray();
        assert_eq!(g.data, vec![76, 150]);
    }
}
