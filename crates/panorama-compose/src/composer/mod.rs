//! Panorama composition pipeline.
//!
//! This module wires together per-image feature extraction, pairwise
//! alignment, the connectivity graph, transform chaining from a reference
//! image, canvas sizing, warping and blending.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::StitchError;
pub use params::{ComposeParams, PairSelection, ReferenceChoice};
pub use pipeline::PanoramaComposer;
pub use result::CompositeCanvas;
