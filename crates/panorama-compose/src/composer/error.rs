use panorama_features::AlignError;

/// Errors returned by [`crate::PanoramaComposer`].
///
/// A failed run never yields a partial canvas.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum StitchError {
    #[error("at least 2 images are required, got {provided}")]
    EmptyInput { provided: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no image pair could be aligned ({} pair failures)", .failures.len())]
    InsufficientOverlap { failures: Vec<AlignError> },
    #[error("images form {} disconnected groups: {groups:?}", .groups.len())]
    DisconnectedImageSet { groups: Vec<Vec<usize>> },
    #[error("image {index} cannot be placed on the canvas")]
    DegeneratePlacement { index: usize },
    #[error("canvas of {width}x{height} exceeds the {limit} pixel limit")]
    CanvasTooLarge {
        width: usize,
        height: usize,
        limit: usize,
    },
}
