use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a pair of images could not be aligned.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AlignError {
    #[error(
        "insufficient overlap between images {from} and {to} ({matches} matches, {inliers} inliers)"
    )]
    InsufficientOverlap {
        from: usize,
        to: usize,
        matches: usize,
        inliers: usize,
    },
    #[error("degenerate transform between images {from} and {to}")]
    DegenerateTransform { from: usize, to: usize },
}

impl AlignError {
    /// Source indices `(from, to)` of the failed pair.
    pub fn pair(&self) -> (usize, usize) {
        match *self {
            Self::InsufficientOverlap { from, to, .. } | Self::DegenerateTransform { from, to } => {
                (from, to)
            }
        }
    }
}
