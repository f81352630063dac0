use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::Homography;

/// Half-open integer pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelRect {
    #[inline]
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

/// Where one source image landed on the composite canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// `SourceImage::index` of the placed image.
    pub source: usize,
    pub source_width: usize,
    pub source_height: usize,
    pub canvas_from_source: Homography,
    pub source_from_canvas: Homography,
    /// Warped pixel-edge corners: top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point2<f64>; 4],
    /// Warped image centre.
    pub center: Point2<f64>,
    /// Canvas pixels the warped image may touch, clipped to the canvas.
    pub bounds: PixelRect,
}

impl Placement {
    /// Place a `width × height` source on a `canvas_width × canvas_height` canvas.
    ///
    /// Returns `None` if the transform is singular or any corner of the
    /// source maps to or behind the line at infinity.
    pub fn new(
        source: usize,
        width: usize,
        height: usize,
        canvas_from_source: Homography,
        canvas_width: usize,
        canvas_height: usize,
    ) -> Option<Self> {
        let source_from_canvas = canvas_from_source.inverse()?;
        let corners = project_corners(&canvas_from_source, width, height)?;
        let center = canvas_from_source
            .apply_checked(Point2::new(width as f64 * 0.5, height as f64 * 0.5))?;

        let (min, max) = corner_extent(&corners);
        let clip = |v: f64, hi: usize| -> usize { v.clamp(0.0, hi as f64) as usize };
        let bounds = PixelRect {
            x0: clip(min.x.floor(), canvas_width),
            y0: clip(min.y.floor(), canvas_height),
            x1: clip(max.x.ceil(), canvas_width),
            y1: clip(max.y.ceil(), canvas_height),
        };

        Some(Self {
            source,
            source_width: width,
            source_height: height,
            canvas_from_source,
            source_from_canvas,
            corners,
            center,
            bounds,
        })
    }

    /// Source-image coordinates of canvas point `(x, y)`, if the point
    /// lands inside the source raster.
    #[inline]
    pub fn source_point(&self, x: f64, y: f64) -> Option<Point2<f64>> {
        let p = self.source_from_canvas.apply_checked(Point2::new(x, y))?;
        let inside = p.x >= 0.0
            && p.y >= 0.0
            && p.x < self.source_width as f64
            && p.y < self.source_height as f64;
        inside.then_some(p)
    }

    /// Whether the warped source covers canvas pixel `(x, y)` (tested at its centre).
    #[inline]
    pub fn covers(&self, x: usize, y: usize) -> bool {
        self.bounds.contains(x, y) && self.source_point(x as f64 + 0.5, y as f64 + 0.5).is_some()
    }

    /// Squared distance from canvas point `(x, y)` to the warped centre.
    #[inline]
    pub fn center_distance_sq(&self, x: f64, y: f64) -> f64 {
        (x - self.center.x).powi(2) + (y - self.center.y).powi(2)
    }
}

/// Project the four pixel-edge corners of a `width × height` raster.
pub fn project_corners(h: &Homography, width: usize, height: usize) -> Option<[Point2<f64>; 4]> {
    let (w, hh) = (width as f64, height as f64);
    Some([
        h.apply_checked(Point2::new(0.0, 0.0))?,
        h.apply_checked(Point2::new(w, 0.0))?,
        h.apply_checked(Point2::new(w, hh))?,
        h.apply_checked(Point2::new(0.0, hh))?,
    ])
}

/// Axis-aligned extent `(min, max)` of a set of points.
pub fn corner_extent(corners: &[Point2<f64>]) -> (Point2<f64>, Point2<f64>) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in corners {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    #[test]
    fn translated_placement_covers_its_footprint() {
        let p = Placement::new(3, 10, 8, Homography::translation(5.0, 2.0), 20, 12)
            .expect("placement");
        assert_eq!(
            p.bounds,
            PixelRect {
                x0: 5,
                y0: 2,
                x1: 15,
                y1: 10
            }
        );
        assert_eq!(p.center, Point2::new(10.0, 6.0));
        assert!(p.covers(5, 2));
        assert!(p.covers(14, 9));
        assert!(!p.covers(15, 9));
        assert!(!p.covers(4, 5));
    }

    #[test]
    fn bounds_are_clipped_to_the_canvas() {
        let p = Placement::new(0, 10, 10, Homography::translation(-4.0, 6.0), 8, 12)
            .expect("placement");
        assert_eq!(
            p.bounds,
            PixelRect {
                x0: 0,
                y0: 6,
                x1: 6,
                y1: 12
            }
        );
    }

    #[test]
    fn singular_transform_is_rejected() {
        let singular = Homography::new(Matrix3::new(
            1.0, 2.0, 0.0, //
            2.0, 4.0, 0.0, //
            0.0, 0.0, 1.0,
        ));
        assert!(Placement::new(0, 4, 4, singular, 10, 10).is_none());
    }
}
