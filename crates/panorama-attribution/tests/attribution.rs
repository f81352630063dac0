use std::sync::Arc;

use nalgebra::Matrix3;
use panorama_attribution::{BoundaryMap, Lookup, SourceLocator};
use panorama_core::{Homography, Placement};

/// `n` sources of `w × h`, each shifted `step` pixels right of the previous one.
fn chain(n: usize, w: usize, h: usize, step: f64) -> (usize, usize, Vec<Placement>) {
    let width = (step * (n - 1) as f64) as usize + w;
    let placements = (0..n)
        .map(|i| {
            Placement::new(
                i,
                w,
                h,
                Homography::translation(step * i as f64, 0.0),
                width,
                h,
            )
            .expect("placement")
        })
        .collect();
    (width, h, placements)
}

#[test]
fn left_to_right_chain_keeps_input_order() {
    let (w, h, placements) = chain(5, 120, 60, 90.0);
    let map = BoundaryMap::build(w, h, &placements);

    for y in [0, 30, 59] {
        assert_eq!(map.sources_left_to_right(y), vec![0, 1, 2, 3, 4]);
    }
    let mut regions = map.regions();
    regions.sort_by_key(|r| r.rect.x0);
    assert_eq!(
        regions.iter().map(|r| r.source).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );
}

#[test]
fn every_canvas_pixel_resolves_and_outside_misses() {
    let (w, h, placements) = chain(3, 80, 40, 64.0);
    let locator = SourceLocator::new(Arc::new(BoundaryMap::build(w, h, &placements)));

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            assert!(locator.locate(x, y).is_found(), "({x}, {y})");
        }
    }
    for (x, y) in [(-1, 0), (w as i64, 0), (0, h as i64), (-5, -5)] {
        assert_eq!(locator.locate(x, y), Lookup::NotFound);
    }
}

#[test]
fn centres_of_thirds_resolve_to_their_source() {
    // Three 300 px tiles with 60 px overlaps on a 780 px canvas.
    let (w, h, placements) = chain(3, 300, 240, 240.0);
    let locator = SourceLocator::new(Arc::new(BoundaryMap::build(w, h, &placements)));
    let third = w as f64 / 3.0;
    for i in 0..3 {
        let x = third * (i as f64 + 0.5);
        assert_eq!(locator.locate_f64(x, 120.0), Lookup::Source(i));
    }
}

#[test]
fn perspective_placements_partition_the_canvas() {
    let tilt = Homography::new(Matrix3::new(
        1.0, 0.02, 100.0, //
        0.01, 1.0, 5.0, //
        2e-4, 0.0, 1.0,
    ));
    let placements = [
        Placement::new(0, 150, 100, Homography::translation(0.0, 5.0), 260, 115).expect("a"),
        Placement::new(1, 150, 100, tilt, 260, 115).expect("b"),
    ];
    let map = BoundaryMap::build(260, 115, &placements);

    let area: usize = map.regions().iter().map(|r| r.rect.area()).sum();
    assert_eq!(area, 260 * 115);
    assert_eq!(map.owner(10, 50), Some(0));
    assert_eq!(map.owner(250, 50), Some(1));
    assert_eq!(map, BoundaryMap::build(260, 115, &placements));
}
