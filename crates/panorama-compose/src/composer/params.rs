use panorama_features::AlignerParams;
use serde::{Deserialize, Serialize};

/// Which image pairs are handed to the aligner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairSelection {
    /// Every pair `i < j` of the input ordering.
    #[default]
    All,
    /// Only neighbours `(i, i + 1)`, for inputs known to form a left-to-right chain.
    Sequential,
}

impl PairSelection {
    /// Input positions of the pairs to align, in a fixed order.
    pub fn pairs(self, n: usize) -> Vec<(usize, usize)> {
        match self {
            Self::All => (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .collect(),
            Self::Sequential => (1..n).map(|j| (j - 1, j)).collect(),
        }
    }
}

/// How the image that defines the canvas frame is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceChoice {
    /// Highest degree, then highest total inliers, then lowest source index.
    #[default]
    MostConnected,
    /// The first image of the input ordering.
    First,
    /// The image with this source index.
    Index(usize),
}

/// Configuration of a [`crate::PanoramaComposer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeParams {
    pub aligner: AlignerParams,
    pub pairs: PairSelection,
    pub reference: ReferenceChoice,
    /// Refuse canvases with more pixels than this.
    pub max_canvas_pixels: usize,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            aligner: AlignerParams::default(),
            pairs: PairSelection::All,
            reference: ReferenceChoice::MostConnected,
            max_canvas_pixels: 64_000_000,
        }
    }
}
