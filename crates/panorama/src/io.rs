//! JSON configuration and report helpers for stitching runs.

use std::sync::Arc;
use std::{
    fs,
    path::{Path, PathBuf},
};

use panorama_attribution::{BoundaryMap, Lookup, SourceLocator};
use panorama_compose::{ComposeParams, CompositeCanvas, StitchError};
use panorama_core::{GeoTag, Placement};
use panorama_features::{AlignerParams, PairwiseTransform};
use serde::{Deserialize, Serialize};

use crate::PanoramaError;

fn default_extension() -> String {
    "jpg".to_string()
}

/// Rotation applied to every input image right after decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

/// How composite pixels are attributed to sources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMode {
    /// Per-pixel ownership from the placements.
    #[default]
    Ownership,
    /// Equal-width vertical slices, one per placed source in input order.
    UniformSlices,
}

impl AttributionMode {
    /// Build the boundary map of `canvas` under this mode.
    pub fn boundary_map(self, canvas: &CompositeCanvas) -> BoundaryMap {
        match self {
            Self::Ownership => BoundaryMap::build(canvas.width(), canvas.height(), &canvas.placements),
            Self::UniformSlices => {
                let sources: Vec<usize> = canvas.placements.iter().map(|p| p.source).collect();
                BoundaryMap::uniform_slices(canvas.width(), canvas.height(), &sources)
            }
        }
    }
}

/// Configuration of one stitching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Explicit input images, in stitching order.
    #[serde(default)]
    pub image_paths: Vec<String>,
    /// Directory scanned for inputs when `image_paths` is empty.
    #[serde(default)]
    pub input_dir: Option<String>,
    /// File extension (case-insensitive) selected from `input_dir`.
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub rotate: Rotation,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    /// Optional geotag per input, in input order.
    #[serde(default)]
    pub geotags: Vec<Option<GeoTag>>,
    /// Aligner overrides; applied on top of `compose.aligner`.
    #[serde(default)]
    pub features: Option<AlignerParams>,
    #[serde(default)]
    pub compose: Option<ComposeParams>,
    #[serde(default)]
    pub attribution: AttributionMode,
}

impl StitchConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PanoramaError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PanoramaError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output image path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("panorama.png"))
    }

    /// Resolve the report path.
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("panorama_report.json"))
    }

    /// Input files in stitching order.
    ///
    /// Directory inputs are sorted by file name.
    pub fn input_paths(&self) -> Result<Vec<PathBuf>, PanoramaError> {
        let paths: Vec<PathBuf> = if !self.image_paths.is_empty() {
            self.image_paths.iter().map(PathBuf::from).collect()
        } else if let Some(dir) = &self.input_dir {
            let wanted = self.extension.trim_start_matches('.').to_ascii_lowercase();
            let mut found = Vec::new();
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                let matches = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.to_ascii_lowercase() == wanted);
                if matches && path.is_file() {
                    found.push(path);
                }
            }
            found.sort();
            found
        } else {
            Vec::new()
        };

        if paths.is_empty() {
            return Err(PanoramaError::NoInputImages);
        }
        Ok(paths)
    }

    /// Validated geotag of input `index`.
    pub fn geotag(&self, index: usize) -> Result<Option<GeoTag>, PanoramaError> {
        match self.geotags.get(index).copied().flatten() {
            None => Ok(None),
            Some(tag) => {
                let checked = GeoTag::new(tag.latitude, tag.longitude)?;
                Ok(Some(match tag.altitude {
                    Some(alt) => checked.with_altitude(alt),
                    None => checked,
                }))
            }
        }
    }

    /// Build composer parameters, applying overrides from the config.
    pub fn build_params(&self) -> ComposeParams {
        let mut params = self.compose.clone().unwrap_or_default();
        if let Some(features) = self.features.clone() {
            params.aligner = features;
        }
        params
    }
}

/// Wall-clock durations of the stages of a run, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingsMs {
    pub load_images: f64,
    pub compose: f64,
    /// Building the boundary map and locator.
    pub attribution: f64,
    pub total: f64,
}

/// Record of a stitching run, sufficient to answer `locate` queries later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchReport {
    pub config_path: String,
    pub image_paths: Vec<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub canvas_width: usize,
    #[serde(default)]
    pub canvas_height: usize,
    #[serde(default)]
    pub reference: Option<usize>,
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub transforms: Vec<PairwiseTransform>,
    #[serde(default)]
    pub attribution: AttributionMode,
    #[serde(default)]
    pub boundary_map: Option<BoundaryMap>,
    #[serde(default)]
    pub geotags: Vec<Option<GeoTag>>,
    /// Source indices per connected group when the set was disconnected.
    #[serde(default)]
    pub groups: Option<Vec<Vec<usize>>>,
    #[serde(default)]
    pub timings_ms: TimingsMs,
    #[serde(default)]
    pub error: Option<String>,
}

impl StitchReport {
    /// Build a base report from the config and resolved inputs.
    pub fn new(cfg: &StitchConfig, config_path: &Path, inputs: &[PathBuf]) -> Self {
        Self {
            config_path: config_path.to_string_lossy().into_owned(),
            image_paths: inputs
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            output_path: None,
            canvas_width: 0,
            canvas_height: 0,
            reference: None,
            placements: Vec::new(),
            transforms: Vec::new(),
            attribution: cfg.attribution,
            boundary_map: None,
            geotags: Vec::new(),
            groups: None,
            timings_ms: TimingsMs::default(),
            error: None,
        }
    }

    /// Populate report fields from a successful composition.
    pub fn set_canvas(&mut self, canvas: &CompositeCanvas, map: &BoundaryMap) {
        self.canvas_width = canvas.width();
        self.canvas_height = canvas.height();
        self.reference = Some(canvas.reference);
        self.placements = canvas.placements.clone();
        self.transforms = canvas.transforms.clone();
        self.boundary_map = Some(map.clone());
        self.error = None;
    }

    /// Record a failure; disconnected groups are kept for a per-group retry.
    pub fn set_error(&mut self, err: &PanoramaError) {
        if let PanoramaError::Stitch(StitchError::DisconnectedImageSet { groups }) = err {
            self.groups = Some(groups.clone());
        }
        self.error = Some(err.to_string());
    }

    /// Locator over the stored boundary map, if the run succeeded.
    pub fn locator(&self) -> Option<SourceLocator> {
        self.boundary_map
            .clone()
            .map(|m| SourceLocator::new(Arc::new(m)))
    }

    /// Owner of canvas point `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> Lookup {
        self.locator()
            .map_or(Lookup::NotFound, |l| l.locate_f64(x, y))
    }

    /// Input path of source `index`.
    pub fn image_path(&self, index: usize) -> Option<&str> {
        self.image_paths.get(index).map(String::as_str)
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PanoramaError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PanoramaError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
