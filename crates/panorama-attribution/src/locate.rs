use std::sync::Arc;

use panorama_core::SourceImage;
use serde::{Deserialize, Serialize};

use crate::BoundaryMap;

/// Result of a composite-space lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// The pixel belongs to the source with this index.
    Source(usize),
    /// Outside the canvas, or the map attributes nothing.
    NotFound,
}

impl Lookup {
    pub fn source_index(self) -> Option<usize> {
        match self {
            Self::Source(i) => Some(i),
            Self::NotFound => None,
        }
    }

    pub fn is_found(self) -> bool {
        matches!(self, Self::Source(_))
    }
}

impl From<Option<usize>> for Lookup {
    fn from(v: Option<usize>) -> Self {
        v.map_or(Self::NotFound, Self::Source)
    }
}

/// Read-only composite-to-source lookup, shareable across threads.
#[derive(Clone, Debug)]
pub struct SourceLocator {
    map: Arc<BoundaryMap>,
    sources: Arc<[SourceImage]>,
}

impl SourceLocator {
    pub fn new(map: Arc<BoundaryMap>) -> Self {
        Self {
            map,
            sources: Arc::from(Vec::new()),
        }
    }

    /// Locator that can also hand out the owning [`SourceImage`].
    pub fn with_sources(map: Arc<BoundaryMap>, sources: Arc<[SourceImage]>) -> Self {
        Self { map, sources }
    }

    pub fn map(&self) -> &BoundaryMap {
        &self.map
    }

    /// Owner of integer canvas coordinate `(x, y)`.
    #[inline]
    pub fn locate(&self, x: i64, y: i64) -> Lookup {
        if x < 0 || y < 0 {
            return Lookup::NotFound;
        }
        self.map.owner(x as usize, y as usize).into()
    }

    /// Owner of the pixel containing continuous point `(x, y)`.
    pub fn locate_f64(&self, x: f64, y: f64) -> Lookup {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return Lookup::NotFound;
        }
        let (w, h) = (self.map.width() as f64, self.map.height() as f64);
        if x >= w || y >= h {
            return Lookup::NotFound;
        }
        self.locate(x.floor() as i64, y.floor() as i64)
    }

    /// The owning source image of `(x, y)`, when the locator was given sources.
    pub fn source(&self, x: i64, y: i64) -> Option<&SourceImage> {
        let index = self.locate(x, y).source_index()?;
        self.sources.iter().find(|s| s.index() == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_core::Raster;

    fn locator() -> SourceLocator {
        let map = Arc::new(BoundaryMap::uniform_slices(9, 4, &[0, 1, 2]));
        let sources: Vec<SourceImage> = (0..3)
            .map(|i| SourceImage::new(i, Raster::zeros(3, 4, 1).expect("raster")))
            .collect();
        SourceLocator::with_sources(map, sources.into())
    }

    #[test]
    fn in_canvas_coordinates_resolve() {
        let loc = locator();
        assert_eq!(loc.locate(0, 0), Lookup::Source(0));
        assert_eq!(loc.locate(4, 3), Lookup::Source(1));
        assert_eq!(loc.locate(8, 2), Lookup::Source(2));
        assert_eq!(loc.locate_f64(5.99, 0.0), Lookup::Source(1));
        assert_eq!(loc.source(7, 1).map(SourceImage::index), Some(2));
    }

    #[test]
    fn out_of_canvas_coordinates_miss() {
        let loc = locator();
        for (x, y) in [(-1, 0), (0, -1), (9, 0), (0, 4), (i64::MAX, 0)] {
            assert_eq!(loc.locate(x, y), Lookup::NotFound, "({x}, {y})");
        }
        assert_eq!(loc.locate_f64(f64::NAN, 1.0), Lookup::NotFound);
        assert_eq!(loc.locate_f64(-0.5, 1.0), Lookup::NotFound);
        assert_eq!(loc.locate_f64(9.0, 1.0), Lookup::NotFound);
        assert_eq!(loc.locate_f64(f64::INFINITY, 1.0), Lookup::NotFound);
        assert!(loc.source(-3, 0).is_none());
    }

    #[test]
    fn locator_without_sources_still_locates() {
        let loc = SourceLocator::new(Arc::new(BoundaryMap::uniform_slices(4, 4, &[0, 1])));
        assert_eq!(loc.locate(3, 3), Lookup::Source(1));
        assert!(loc.source(3, 3).is_none());
    }

    #[test]
    fn locator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SourceLocator>();

        let loc = locator();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let loc = loc.clone();
                std::thread::spawn(move || loc.locate(t * 2, 1))
            })
            .collect();
        let got: Vec<Lookup> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        assert_eq!(
            got,
            vec![
                Lookup::Source(0),
                Lookup::Source(0),
                Lookup::Source(1),
                Lookup::Source(2)
            ]
        );
    }
}
