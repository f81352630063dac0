//! 256-bit steered BRIEF.

use panorama_core::{sample_bilinear, GrayImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::keypoint::LevelCorner;

pub const DESCRIPTOR_BITS: usize = 256;

const PATTERN_SEED: u64 = 0x0b1e_f00d;

/// Packed binary descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Descriptor(pub [u64; 4]);

impl Descriptor {
    #[inline]
    pub fn hamming(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    #[inline]
    pub fn bit(&self, i: usize) -> bool {
        (self.0[i / 64] >> (i % 64)) & 1 == 1
    }

    #[inline]
    fn set(&mut self, i: usize) {
        self.0[i / 64] |= 1 << (i % 64);
    }
}

/// Point pairs of the comparison pattern, relative to the keypoint.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BriefPattern {
    pairs: Vec<([f32; 2], [f32; 2])>,
}

impl BriefPattern {
    /// Pairs drawn uniformly from a disc of `radius`, from a fixed seed.
    pub fn new(radius: f32) -> Self {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut point = || loop {
            let x: f32 = rng.random_range(-radius..=radius);
            let y: f32 = rng.random_range(-radius..=radius);
            if x * x + y * y <= radius * radius {
                break [x, y];
            }
        };
        let pairs = (0..DESCRIPTOR_BITS)
            .map(|_| {
                let a = point();
                let b = point();
                (a, b)
            })
            .collect();
        Self { pairs }
    }

    /// Describe `corner` on the smoothed level image, steering the pattern by its angle.
    pub fn describe(&self, smoothed: &GrayImage, corner: &LevelCorner) -> Descriptor {
        let view = smoothed.view();
        let (s, c) = corner.angle.sin_cos();
        let (cx, cy) = (corner.x as f32, corner.y as f32);
        let rotate = |p: [f32; 2]| (cx + c * p[0] - s * p[1], cy + s * p[0] + c * p[1]);

        let mut d = Descriptor::default();
        for (i, &(a, b)) in self.pairs.iter().enumerate() {
            let (ax, ay) = rotate(a);
            let (bx, by) = rotate(b);
            if sample_bilinear(&view, ax, ay) < sample_bilinear(&view, bx, by) {
                d.set(i);
            }
        }
        d
    }
}
