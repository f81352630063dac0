//! High-level facade for the `panorama-*` workspace.
//!
//! This crate provides:
//! - re-exports of the alignment, composition and attribution crates
//! - [`stitch::stitch`], which composes source images and builds the boundary
//!   map that answers `locate(x, y)` queries
//! - (feature `image`) decoding inputs, saving the panorama and running a JSON
//!   configured job end to end
//!
//! ## Quickstart
//!
//! ```no_run
//! use panorama::image_io::load_source_images;
//! use panorama::io::{AttributionMode, StitchConfig};
//! use panorama::stitch::stitch;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = StitchConfig::load_json("stitch.json")?;
//! let images = load_source_images(&cfg, &cfg.input_paths()?)?;
//! let stitched = stitch(&images, &cfg.build_params(), AttributionMode::Ownership)?;
//! println!("pixel (10, 20) comes from {:?}", stitched.locate(10, 20));
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `panorama::core`: homographies, rasters, placements, source images.
//! - `panorama::features`: keypoints, descriptors, matching and [`FeatureAligner`].
//! - `panorama::compose`: the connectivity graph and [`PanoramaComposer`].
//! - `panorama::attribution`: [`BoundaryMap`] and [`SourceLocator`].
//! - `panorama::io`: JSON config and report types.
//! - `panorama::image_io` (feature `image`): end-to-end helpers on files.

pub use panorama_attribution as attribution;
pub use panorama_compose as compose;
pub use panorama_core as core;
pub use panorama_features as features;

pub use panorama_attribution::{BoundaryMap, Lookup, SourceLocator};
pub use panorama_compose::{ComposeParams, CompositeCanvas, PanoramaComposer, StitchError};
pub use panorama_core::{GeoTag, Homography, Placement, Raster, SourceImage};
pub use panorama_features::{AlignError, AlignerParams, FeatureAligner, PairwiseTransform};

mod error;
pub mod io;
pub mod stitch;

#[cfg(feature = "image")]
pub mod image_io;

pub use error::PanoramaError;
