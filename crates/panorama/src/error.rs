use panorama_compose::StitchError;
use panorama_core::{GeoTagError, RasterError};

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum PanoramaError {
    #[error("no input images")]
    NoInputImages,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    GeoTag(#[from] GeoTagError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
