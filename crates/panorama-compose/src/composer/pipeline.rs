use std::collections::HashSet;

use log::{debug, info, warn};
use nalgebra::Point2;
use panorama_core::{corner_extent, project_corners, Homography, Placement, SourceImage};
use panorama_features::{AlignError, FeatureAligner, ImageFeatures, PairwiseTransform};
use rayon::prelude::*;

use super::{ComposeParams, CompositeCanvas, StitchError};
use crate::graph::ConnectivityGraph;
use crate::warp::{blend, warp_source, WarpedTile};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Corner coordinates this close to an integer snap onto it when sizing the canvas.
const CANVAS_SNAP: f64 = 1e-6;

/// Feature-based panorama composer.
#[derive(Clone, Debug)]
pub struct PanoramaComposer {
    params: ComposeParams,
    aligner: FeatureAligner,
}

impl Default for PanoramaComposer {
    fn default() -> Self {
        Self::new(ComposeParams::default())
    }
}

impl PanoramaComposer {
    pub fn new(params: ComposeParams) -> Self {
        let aligner = FeatureAligner::new(params.aligner.clone());
        Self { params, aligner }
    }

    #[inline]
    pub fn params(&self) -> &ComposeParams {
        &self.params
    }

    #[inline]
    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    /// Align, place, warp and blend `images` into one canvas.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, images), fields(images = images.len()))
    )]
    pub fn compose(&self, images: &[SourceImage]) -> Result<CompositeCanvas, StitchError> {
        validate(images)?;
        let sources: Vec<usize> = images.iter().map(SourceImage::index).collect();

        let features: Vec<ImageFeatures> = images
            .par_iter()
            .map(|img| self.aligner.extract(img))
            .collect();
        info!(
            "extracted features for {} images ({} keypoints total)",
            images.len(),
            features.iter().map(|f| f.keypoints.len()).sum::<usize>()
        );

        let pairs = self.params.pairs.pairs(images.len());
        let outcomes: Vec<Result<PairwiseTransform, AlignError>> = pairs
            .par_iter()
            .map(|&(i, j)| self.aligner.align(&features[i], &features[j]))
            .collect();

        let mut accepted = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(t) => {
                    debug!(
                        "pair {}->{} accepted: {} inliers of {} matches",
                        t.from, t.to, t.inliers, t.matches
                    );
                    accepted.push(t);
                }
                Err(e) => {
                    warn!("pair discarded: {e}");
                    failures.push(e);
                }
            }
        }
        info!(
            "aligned {} of {} pairs",
            accepted.len(),
            accepted.len() + failures.len()
        );
        if accepted.is_empty() {
            return Err(StitchError::InsufficientOverlap { failures });
        }

        let graph = ConnectivityGraph::new(sources.clone(), accepted);
        let groups = graph.component_sources();
        if groups.len() > 1 {
            return Err(StitchError::DisconnectedImageSet { groups });
        }

        let reference = graph.reference(self.params.reference).ok_or_else(|| {
            StitchError::InvalidInput(format!(
                "reference {:?} does not name an input image",
                self.params.reference
            ))
        })?;
        let chain = graph
            .chain_from(reference)
            .ok_or(StitchError::DegeneratePlacement {
                index: sources[reference],
            })?;
        info!(
            "reference image {} with {} tree edges",
            sources[reference],
            chain.edges.len()
        );

        let (offset, width, height) = self.canvas_frame(images, &chain.reference_from)?;
        let placements = images
            .iter()
            .zip(&chain.reference_from)
            .map(|(img, h)| {
                let canvas_from_source = offset
                    .then_after(h)
                    .ok_or(StitchError::DegeneratePlacement { index: img.index() })?;
                Placement::new(
                    img.index(),
                    img.width(),
                    img.height(),
                    canvas_from_source,
                    width,
                    height,
                )
                .ok_or(StitchError::DegeneratePlacement { index: img.index() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tiles: Vec<WarpedTile> = images
            .par_iter()
            .zip(placements.par_iter())
            .map(|(img, p)| warp_source(img.raster(), p))
            .collect();
        let channels = images[0].raster().channels();
        let image = blend(width, height, channels, &tiles)
            .map_err(|e| StitchError::InvalidInput(e.to_string()))?;
        info!("composed {width}x{height} canvas from {} images", images.len());

        Ok(CompositeCanvas {
            image,
            placements,
            reference: sources[reference],
            transforms: chain.edges,
        })
    }

    /// Compose only the images whose source index is in `indices`, keeping
    /// their input order and indices.
    pub fn compose_subset(
        &self,
        images: &[SourceImage],
        indices: &[usize],
    ) -> Result<CompositeCanvas, StitchError> {
        let wanted: HashSet<usize> = indices.iter().copied().collect();
        let subset: Vec<SourceImage> = images
            .iter()
            .filter(|img| wanted.contains(&img.index()))
            .cloned()
            .collect();
        let found: HashSet<usize> = subset.iter().map(SourceImage::index).collect();
        if let Some(missing) = indices.iter().find(|i| !found.contains(i)) {
            return Err(StitchError::InvalidInput(format!(
                "no input image has index {missing}"
            )));
        }
        self.compose(&subset)
    }

    /// Canvas offset and size from the union of all warped pixel-edge corners.
    fn canvas_frame(
        &self,
        images: &[SourceImage],
        reference_from: &[Homography],
    ) -> Result<(Homography, usize, usize), StitchError> {
        let mut corners: Vec<Point2<f64>> = Vec::with_capacity(images.len() * 4);
        for (img, h) in images.iter().zip(reference_from) {
            let q = project_corners(h, img.width(), img.height())
                .filter(|q| q.iter().all(|p| p.x.is_finite() && p.y.is_finite()))
                .ok_or(StitchError::DegeneratePlacement { index: img.index() })?;
            corners.extend_from_slice(&q);
        }

        let (min, max) = corner_extent(&corners);
        let x0 = (min.x + CANVAS_SNAP).floor();
        let y0 = (min.y + CANVAS_SNAP).floor();
        let x1 = (max.x - CANVAS_SNAP).ceil();
        let y1 = (max.y - CANVAS_SNAP).ceil();
        let (w, h) = ((x1 - x0).max(1.0), (y1 - y0).max(1.0));

        let limit = self.params.max_canvas_pixels;
        if w * h > limit as f64 {
            return Err(StitchError::CanvasTooLarge {
                width: w.min(usize::MAX as f64) as usize,
                height: h.min(usize::MAX as f64) as usize,
                limit,
            });
        }
        Ok((Homography::translation(-x0, -y0), w as usize, h as usize))
    }
}

fn validate(images: &[SourceImage]) -> Result<(), StitchError> {
    if images.len() < 2 {
        return Err(StitchError::EmptyInput {
            provided: images.len(),
        });
    }
    let channels = images[0].raster().channels();
    let mut seen = HashSet::with_capacity(images.len());
    for img in images {
        if img.width() == 0 || img.height() == 0 {
            return Err(StitchError::InvalidInput(format!(
                "image {} has zero size",
                img.index()
            )));
        }
        if img.raster().channels() != channels {
            return Err(StitchError::InvalidInput(format!(
                "image {} has {} channels, expected {channels}",
                img.index(),
                img.raster().channels()
            )));
        }
        if !seen.insert(img.index()) {
            return Err(StitchError::InvalidInput(format!(
                "duplicate image index {}",
                img.index()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_core::Raster;

    fn gray(index: usize, w: usize, h: usize, channels: usize) -> SourceImage {
        SourceImage::new(
            index,
            Raster::zeros(w, h, channels).expect("raster"),
        )
    }

    #[test]
    fn validation_rejects_bad_inputs() {
        assert_eq!(
            validate(&[gray(0, 4, 4, 1)]),
            Err(StitchError::EmptyInput { provided: 1 })
        );
        assert!(matches!(
            validate(&[gray(0, 4, 4, 1), gray(1, 4, 4, 3)]),
            Err(StitchError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&[gray(2, 4, 4, 1), gray(2, 4, 4, 1)]),
            Err(StitchError::InvalidInput(_))
        ));
        assert_eq!(validate(&[gray(0, 4, 4, 1), gray(1, 8, 2, 1)]), Ok(()));
    }

    #[test]
    fn canvas_frame_snaps_to_whole_pixels() {
        let composer = PanoramaComposer::default();
        let images = [gray(0, 10, 8, 1), gray(1, 10, 8, 1)];
        let hs = [
            Homography::identity(),
            Homography::translation(6.0 + 1e-9, -2.0),
        ];
        let (offset, w, h) = composer.canvas_frame(&images, &hs).expect("frame");
        assert_eq!((w, h), (16, 10));
        let origin = offset.apply(Point2::new(0.0, -2.0));
        assert!(origin.x.abs() < 1e-12 && origin.y.abs() < 1e-12);
    }

    #[test]
    fn oversized_canvas_is_refused() {
        let composer = PanoramaComposer::new(ComposeParams {
            max_canvas_pixels: 100,
            ..ComposeParams::default()
        });
        let images = [gray(0, 10, 10, 1), gray(1, 10, 10, 1)];
        let hs = [Homography::identity(), Homography::translation(5.0, 0.0)];
        assert_eq!(
            composer.canvas_frame(&images, &hs).map(|_| ()),
            Err(StitchError::CanvasTooLarge {
                width: 15,
                height: 10,
                limit: 100
            })
        );
    }

    #[test]
    fn subset_with_unknown_index_is_invalid() {
        let composer = PanoramaComposer::default();
        let images = [gray(0, 4, 4, 1), gray(1, 4, 4, 1)];
        assert!(matches!(
            composer.compose_subset(&images, &[0, 5]),
            Err(StitchError::InvalidInput(_))
        ));
    }
}
