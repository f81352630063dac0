//! Pairwise image alignment for panorama stitching.
//!
//! Pipeline per image pair:
//! 1. [`FeatureAligner::extract`] finds oriented FAST corners over a scale
//!    pyramid and describes them with 256-bit steered BRIEF.
//! 2. [`match_descriptors`] pairs descriptors by Hamming distance with a ratio
//!    test, a distance cap and optional cross-checking.
//! 3. [`ransac_homography`] fits a homography robustly, refits it on the
//!    consensus set and keeps the simplest [`MotionModel`] the inliers support.
//! 4. [`FeatureAligner::align`] accepts or rejects the fit and reports a
//!    [`PairwiseTransform`] or an [`AlignError`].
//!
//! ```no_run
//! use panorama_core::{Raster, SourceImage};
//! use panorama_features::FeatureAligner;
//!
//! # fn load(_: &str) -> Raster { unimplemented!() }
//! let left = SourceImage::new(0, load("left.png"));
//! let right = SourceImage::new(1, load("right.png"));
//! let aligner = FeatureAligner::default();
//! match aligner.align_images(&left, &right) {
//!     Ok(t) => println!("{} inliers, H = {:?}", t.inliers, t.homography),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

mod aligner;
mod descriptor;
mod error;
mod keypoint;
mod matcher;
mod params;
mod pyramid;
mod ransac;

pub use aligner::{stitch_confidence, FeatureAligner, ImageFeatures, PairwiseTransform};
pub use descriptor::{Descriptor, DESCRIPTOR_BITS};
pub use error::AlignError;
pub use keypoint::Keypoint;
pub use matcher::{match_descriptors, Match};
pub use params::{AlignerParams, MatchParams, OrbParams, RansacParams};
pub use ransac::{ransac_homography, MotionModel, RansacResult};
