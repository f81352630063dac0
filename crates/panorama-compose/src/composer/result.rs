use panorama_core::{Placement, Raster};
use panorama_features::PairwiseTransform;

/// Output of a composition run.
#[derive(Clone, Debug)]
pub struct CompositeCanvas {
    /// Blended panorama; uncovered pixels are zero.
    pub image: Raster,
    /// One placement per source image, in input order.
    pub placements: Vec<Placement>,
    /// Source index of the image that defines the canvas frame.
    pub reference: usize,
    /// Spanning-tree edges used to chain the placements, in the order they were added.
    pub transforms: Vec<PairwiseTransform>,
}

impl CompositeCanvas {
    #[inline]
    pub fn width(&self) -> usize {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Placement of the source with index `source`, if it was composed.
    pub fn placement(&self, source: usize) -> Option<&Placement> {
        self.placements.iter().find(|p| p.source == source)
    }
}
