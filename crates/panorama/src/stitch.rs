use std::sync::Arc;

use panorama_attribution::{BoundaryMap, Lookup, SourceLocator};
use panorama_compose::{ComposeParams, CompositeCanvas, PanoramaComposer, StitchError};
use panorama_core::SourceImage;

use crate::io::AttributionMode;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A composed panorama together with its attribution.
#[derive(Clone, Debug)]
pub struct Stitched {
    pub canvas: CompositeCanvas,
    pub map: Arc<BoundaryMap>,
    pub locator: SourceLocator,
}

impl Stitched {
    /// Owner of canvas pixel `(x, y)`.
    #[inline]
    pub fn locate(&self, x: i64, y: i64) -> Lookup {
        self.locator.locate(x, y)
    }
}

/// Compose `images` and build the boundary map of the result.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(images, params), fields(images = images.len()))
)]
pub fn stitch(
    images: &[SourceImage],
    params: &ComposeParams,
    mode: AttributionMode,
) -> Result<Stitched, StitchError> {
    let canvas = PanoramaComposer::new(params.clone()).compose(images)?;
    Ok(attribute(canvas, images, mode))
}

/// Build the boundary map and locator for an already composed canvas.
pub fn attribute(canvas: CompositeCanvas, images: &[SourceImage], mode: AttributionMode) -> Stitched {
    let map = Arc::new(mode.boundary_map(&canvas));
    log::info!(
        "attributed {}x{} canvas into {} regions ({mode:?})",
        canvas.width(),
        canvas.height(),
        map.region_count()
    );
    let locator = SourceLocator::with_sources(Arc::clone(&map), Arc::from(images.to_vec()));
    Stitched {
        canvas,
        map,
        locator,
    }
}
