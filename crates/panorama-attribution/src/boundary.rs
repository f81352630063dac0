//! Canvas ownership map: which source image each composite pixel belongs to.
//!
//! Storage is row-wise run-length encoding. Consecutive identical rows merge
//! into one band, so lookups cost `O(log bands + log runs)`.

use log::debug;
use panorama_core::{PixelRect, Placement};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Horizontal span `[x_start, x_end)` owned by `source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Run {
    pub x_start: usize,
    pub x_end: usize,
    pub source: usize,
}

/// Rows `[y_start, y_end)` sharing the same runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub y_start: usize,
    pub y_end: usize,
    pub runs: Vec<Run>,
}

/// Rectangle of canvas pixels owned by one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub rect: PixelRect,
    pub source: usize,
}

/// Gap-free, non-overlapping partition of a `width × height` canvas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryMap {
    width: usize,
    height: usize,
    bands: Vec<Band>,
}

impl BoundaryMap {
    /// Attribute every canvas pixel to a placement.
    ///
    /// A pixel belongs to the covering placement whose warped centre is
    /// nearest to the pixel centre, ties going to the lower source index.
    /// Pixels no placement covers fall back to the same rule over all
    /// placements. With no placements the map is empty and every lookup misses.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(placements), fields(placements = placements.len()))
    )]
    pub fn build(width: usize, height: usize, placements: &[Placement]) -> Self {
        if width == 0 || height == 0 || placements.is_empty() {
            return Self {
                width,
                height,
                bands: Vec::new(),
            };
        }

        let rows: Vec<Vec<Run>> = (0..height)
            .into_par_iter()
            .map(|y| row_runs(width, y, placements))
            .collect();
        let map = Self::from_rows(width, height, rows);
        debug!(
            "boundary map {}x{}: {} bands, {} regions",
            width,
            height,
            map.bands.len(),
            map.region_count()
        );
        map
    }

    /// Equal-width vertical slices, slice `i` owned by `sources[i]`.
    ///
    /// Each slice is `width / sources.len()` columns wide; the remaining
    /// columns go to the last slice so the canvas stays fully covered. Empty
    /// slices are dropped.
    pub fn uniform_slices(width: usize, height: usize, sources: &[usize]) -> Self {
        let n = sources.len();
        if width == 0 || height == 0 || n == 0 {
            return Self {
                width,
                height,
                bands: Vec::new(),
            };
        }
        let slice = width / n;
        let runs = sources
            .iter()
            .enumerate()
            .map(|(i, &source)| Run {
                x_start: i * slice,
                x_end: if i + 1 == n { width } else { (i + 1) * slice },
                source,
            })
            .filter(|r| r.x_end > r.x_start)
            .collect();
        Self {
            width,
            height,
            bands: vec![Band {
                y_start: 0,
                y_end: height,
                runs,
            }],
        }
    }

    fn from_rows(width: usize, height: usize, rows: Vec<Vec<Run>>) -> Self {
        let mut bands: Vec<Band> = Vec::new();
        for (y, runs) in rows.into_iter().enumerate() {
            if let Some(band) = bands.last_mut().filter(|b| b.runs == runs) {
                band.y_end = y + 1;
                continue;
            }
            bands.push(Band {
                y_start: y,
                y_end: y + 1,
                runs,
            });
        }
        Self {
            width,
            height,
            bands,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Owner of pixel `(x, y)`, `None` outside the canvas.
    pub fn owner(&self, x: usize, y: usize) -> Option<usize> {
        let runs = self.row(y)?;
        let i = runs.partition_point(|r| r.x_end <= x);
        runs.get(i).filter(|r| r.x_start <= x).map(|r| r.source)
    }

    /// Runs of row `y`, left to right.
    pub fn row(&self, y: usize) -> Option<&[Run]> {
        if y >= self.height {
            return None;
        }
        let i = self.bands.partition_point(|b| b.y_end <= y);
        self.bands
            .get(i)
            .filter(|b| b.y_start <= y)
            .map(|b| b.runs.as_slice())
    }

    /// Owners of row `y` from left to right, consecutive duplicates removed.
    pub fn sources_left_to_right(&self, y: usize) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for r in self.row(y).unwrap_or(&[]) {
            if out.last() != Some(&r.source) {
                out.push(r.source);
            }
        }
        out
    }

    /// Every run as a rectangle, in band then x order.
    pub fn regions(&self) -> Vec<Region> {
        self.bands
            .iter()
            .flat_map(|b| {
                b.runs.iter().map(move |r| Region {
                    rect: PixelRect {
                        x0: r.x_start,
                        y0: b.y_start,
                        x1: r.x_end,
                        y1: b.y_end,
                    },
                    source: r.source,
                })
            })
            .collect()
    }

    pub fn region_count(&self) -> usize {
        self.bands.iter().map(|b| b.runs.len()).sum()
    }
}

/// Run-length encoded owners of one canvas row.
fn row_runs(width: usize, y: usize, placements: &[Placement]) -> Vec<Run> {
    let cy = y as f64 + 0.5;
    let in_row: Vec<&Placement> = placements
        .iter()
        .filter(|p| y >= p.bounds.y0 && y < p.bounds.y1)
        .collect();

    let mut runs: Vec<Run> = Vec::new();
    for x in 0..width {
        let cx = x as f64 + 0.5;
        let source = nearest(in_row.iter().copied().filter(|p| p.covers(x, y)), cx, cy)
            .or_else(|| nearest(placements.iter(), cx, cy))
            .map_or(0, |p| p.source);
        if let Some(r) = runs.last_mut().filter(|r| r.source == source) {
            r.x_end = x + 1;
            continue;
        }
        runs.push(Run {
            x_start: x,
            x_end: x + 1,
            source,
        });
    }
    runs
}

/// Placement with the nearest warped centre; ties to the lower source index.
fn nearest<'a>(
    candidates: impl Iterator<Item = &'a Placement>,
    x: f64,
    y: f64,
) -> Option<&'a Placement> {
    candidates.min_by(|a, b| {
        a.center_distance_sq(x, y)
            .total_cmp(&b.center_distance_sq(x, y))
            .then(a.source.cmp(&b.source))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_core::Homography;

    fn strip(
        source: usize,
        x: f64,
        width: usize,
        height: usize,
        canvas: (usize, usize),
    ) -> Placement {
        Placement::new(
            source,
            width,
            height,
            Homography::translation(x, 0.0),
            canvas.0,
            canvas.1,
        )
        .expect("placement")
    }

    fn covered(map: &BoundaryMap) -> usize {
        map.regions().iter().map(|r| r.rect.area()).sum()
    }

    #[test]
    fn overlap_splits_at_the_midpoint_between_centres() {
        // Centres at x = 5 and x = 11; overlap [6, 10); midpoint 8.
        let canvas = (16, 4);
        let map = BoundaryMap::build(
            16,
            4,
            &[strip(0, 0.0, 10, 4, canvas), strip(1, 6.0, 10, 4, canvas)],
        );
        assert_eq!(map.bands().len(), 1);
        assert_eq!(
            map.row(2).expect("row"),
            &[
                Run {
                    x_start: 0,
                    x_end: 8,
                    source: 0
                },
                Run {
                    x_start: 8,
                    x_end: 16,
                    source: 1
                }
            ]
        );
        assert_eq!(covered(&map), 16 * 4);
    }

    #[test]
    fn equidistant_pixels_go_to_the_lower_index() {
        // Source 3 spans [2, 6) with centre 4, source 1 spans [3, 11) with centre 7.
        let canvas = (12, 2);
        let map = BoundaryMap::build(
            12,
            2,
            &[strip(3, 2.0, 4, 2, canvas), strip(1, 3.0, 8, 2, canvas)],
        );
        assert_eq!(map.owner(4, 0), Some(3));
        // Pixel centre 5.5 is 1.5 from both centres.
        assert_eq!(map.owner(5, 0), Some(1));
        assert_eq!(map.owner(0, 0), Some(3));
        assert_eq!(map.owner(11, 1), Some(1));
    }

    #[test]
    fn gaps_use_the_nearest_centre() {
        let canvas = (20, 2);
        let map = BoundaryMap::build(
            20,
            2,
            &[strip(0, 0.0, 6, 2, canvas), strip(1, 14.0, 6, 2, canvas)],
        );
        assert_eq!(map.owner(8, 0), Some(0));
        assert_eq!(map.owner(11, 0), Some(1));
        assert_eq!(covered(&map), 40);
    }

    #[test]
    fn identical_rows_merge_into_bands() {
        let canvas = (10, 10);
        let top = strip(0, 0.0, 10, 5, canvas);
        let bottom = Placement::new(1, 10, 5, Homography::translation(0.0, 5.0), 10, 10)
            .expect("placement");
        let map = BoundaryMap::build(10, 10, &[top, bottom]);
        assert_eq!(map.bands().len(), 2);
        assert_eq!(map.region_count(), 2);
        assert_eq!(map.owner(3, 4), Some(0));
        assert_eq!(map.owner(3, 5), Some(1));
    }

    #[test]
    fn lookups_outside_the_canvas_miss() {
        let canvas = (8, 8);
        let map = BoundaryMap::build(8, 8, &[strip(0, 0.0, 8, 8, canvas)]);
        assert_eq!(map.owner(7, 7), Some(0));
        assert_eq!(map.owner(8, 0), None);
        assert_eq!(map.owner(0, 8), None);
        assert!(map.row(8).is_none());
        assert!(BoundaryMap::build(8, 8, &[]).owner(1, 1).is_none());
    }

    #[test]
    fn uniform_slices_give_leftover_to_the_last() {
        let map = BoundaryMap::uniform_slices(10, 3, &[0, 1, 2]);
        let row = map.row(1).expect("row");
        assert_eq!(
            row.iter().map(|r| (r.x_start, r.x_end, r.source)).collect::<Vec<_>>(),
            vec![(0, 3, 0), (3, 6, 1), (6, 10, 2)]
        );
        assert_eq!(map.sources_left_to_right(0), vec![0, 1, 2]);

        let narrow = BoundaryMap::uniform_slices(2, 1, &[0, 1, 2, 3]);
        assert_eq!(narrow.sources_left_to_right(0), vec![3]);
        assert_eq!(covered(&narrow), 2);
    }

    #[test]
    fn uniform_slices_carry_the_given_source_indices() {
        let map = BoundaryMap::uniform_slices(9, 2, &[5, 7, 12]);
        assert_eq!(map.sources_left_to_right(1), vec![5, 7, 12]);
        assert_eq!(map.owner(0, 0), Some(5));
        assert_eq!(map.owner(4, 1), Some(7));
        assert_eq!(map.owner(8, 0), Some(12));
    }

    #[test]
    fn map_round_trips_through_json() {
        let map = BoundaryMap::uniform_slices(12, 4, &[0, 1]);
        let json = serde_json::to_string(&map).expect("serialize");
        let back: BoundaryMap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, map);
    }
}
