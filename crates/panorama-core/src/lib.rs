//! Core types and utilities for panorama stitching.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any image codec: callers wrap decoded pixels in [`Raster`].

mod homography;
mod image;
mod logger;
mod placement;
mod source;

pub use homography::{
    estimate_affine, estimate_homography, estimate_similarity, homography_from_4pt, Homography,
};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, Raster, RasterError};
pub use placement::{corner_extent, project_corners, PixelRect, Placement};
pub use source::{GeoTag, GeoTagError, SourceImage};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
