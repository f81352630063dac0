//! Global composition of aligned source images into one panorama.
//!
//! ```no_run
//! use panorama_compose::{PanoramaComposer, StitchError};
//! use panorama_core::SourceImage;
//!
//! # fn inputs() -> Vec<SourceImage> { Vec::new() }
//! let images = inputs();
//! match PanoramaComposer::default().compose(&images) {
//!     Ok(canvas) => println!("{}x{}", canvas.width(), canvas.height()),
//!     Err(StitchError::DisconnectedImageSet { groups }) => {
//!         println!("retry per group: {groups:?}");
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

mod composer;
mod graph;
mod warp;

pub use composer::{
    ComposeParams, CompositeCanvas, PairSelection, PanoramaComposer, ReferenceChoice, StitchError,
};
pub use graph::{ChainedTransforms, ConnectivityGraph};
