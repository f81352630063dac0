//! Spatial attribution for composed panoramas.
//!
//! [`BoundaryMap`] partitions the canvas into regions owned by source images;
//! [`SourceLocator`] answers `locate(x, y)` queries against it without locks.

mod boundary;
mod locate;

pub use boundary::{Band, BoundaryMap, Region, Run};
pub use locate::{Lookup, SourceLocator};
