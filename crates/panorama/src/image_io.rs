//! Decoding inputs and encoding panoramas with the `image` crate.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ::image::{DynamicImage, ImageFormat, RgbImage};
use panorama_compose::{ComposeParams, PanoramaComposer};
use panorama_core::{Raster, RasterError, SourceImage};

use crate::io::{AttributionMode, Rotation, StitchConfig, StitchReport};
use crate::stitch::{attribute, stitch, Stitched};
use crate::PanoramaError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Wrap an `image::RgbImage` into a 3-channel [`Raster`].
pub fn raster_from_rgb(img: &RgbImage) -> Result<Raster, RasterError> {
    Raster::from_raw(
        img.width() as usize,
        img.height() as usize,
        3,
        img.as_raw().clone(),
    )
}

/// Expand a 1-, 3- or 4-channel raster into an `image::RgbImage`.
pub fn raster_to_rgb(raster: &Raster) -> Result<RgbImage, RasterError> {
    let (w, h, c) = (raster.width(), raster.height(), raster.channels());
    let data: Vec<u8> = match c {
        3 => raster.as_raw().to_vec(),
        1 => raster.as_raw().iter().flat_map(|&v| [v, v, v]).collect(),
        4 => raster
            .as_raw()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        other => return Err(RasterError::UnsupportedChannels(other)),
    };
    let got = data.len();
    RgbImage::from_raw(w as u32, h as u32, data).ok_or(RasterError::BufferLength {
        expected: w * h * 3,
        got,
    })
}

fn rotate(img: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => img,
        Rotation::Cw90 => img.rotate90(),
        Rotation::Cw180 => img.rotate180(),
        Rotation::Cw270 => img.rotate270(),
    }
}

/// Decode, rotate and wrap every input; source indices follow `paths`.
pub fn load_source_images(
    cfg: &StitchConfig,
    paths: &[PathBuf],
) -> Result<Vec<SourceImage>, PanoramaError> {
    if cfg.geotags.len() > paths.len() {
        return Err(PanoramaError::InvalidConfig(format!(
            "{} geotags for {} images",
            cfg.geotags.len(),
            paths.len()
        )));
    }

    let mut images = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let decoded = rotate(::image::open(path)?, cfg.rotate).to_rgb8();
        log::debug!(
            "loaded {} as source {index} ({}x{})",
            path.display(),
            decoded.width(),
            decoded.height()
        );
        let mut source = SourceImage::new(index, raster_from_rgb(&decoded)?);
        if let Some(tag) = cfg.geotag(index)? {
            source = source.with_geotag(tag);
        }
        images.push(source);
    }
    Ok(images)
}

/// Stitch in-memory RGB images; source indices follow slice order.
pub fn stitch_rgb(
    images: &[RgbImage],
    params: &ComposeParams,
    mode: AttributionMode,
) -> Result<Stitched, PanoramaError> {
    let sources = images
        .iter()
        .enumerate()
        .map(|(i, img)| Ok(SourceImage::new(i, raster_from_rgb(img)?)))
        .collect::<Result<Vec<_>, RasterError>>()?;
    Ok(stitch(&sources, params, mode)?)
}

/// Fail unless `path` names a PNG file; panoramas are only written losslessly.
pub fn check_output_path(path: &Path) -> Result<(), PanoramaError> {
    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if is_png {
        Ok(())
    } else {
        Err(PanoramaError::InvalidConfig(format!(
            "output {} must be a .png file",
            path.display()
        )))
    }
}

/// Save the panorama of `stitched` to `path` as PNG.
pub fn save_panorama(path: &Path, stitched: &Stitched) -> Result<(), PanoramaError> {
    check_output_path(path)?;
    raster_to_rgb(&stitched.canvas.image)?.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Run a full stitching job described by `cfg`.
///
/// The report is written even when composition fails; in that case it carries
/// the error (and the connected groups, for a disconnected set) and the error
/// is returned as well.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(cfg)))]
pub fn run_config(cfg: &StitchConfig, config_path: &Path) -> Result<StitchReport, PanoramaError> {
    let t_total = Instant::now();
    let inputs = cfg.input_paths()?;
    let mut report = StitchReport::new(cfg, config_path, &inputs);

    let outcome = run_stages(cfg, &inputs, &mut report);
    report.timings_ms.total = elapsed_ms(t_total);

    let report_path = cfg.report_path();
    if let Err(err) = &outcome {
        log::error!("stitching failed: {err}");
        report.set_error(err);
    }
    report.write_json(&report_path)?;
    log::info!("wrote report JSON to {}", report_path.display());

    outcome.map(|()| report)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}

fn run_stages(
    cfg: &StitchConfig,
    inputs: &[PathBuf],
    report: &mut StitchReport,
) -> Result<(), PanoramaError> {
    let output_path = cfg.output_path();
    check_output_path(&output_path)?;

    let start = Instant::now();
    let images = load_source_images(cfg, inputs)?;
    report.geotags = images.iter().map(|s| s.geotag().copied()).collect();
    report.timings_ms.load_images = elapsed_ms(start);

    let start = Instant::now();
    let canvas = PanoramaComposer::new(cfg.build_params()).compose(&images)?;
    report.timings_ms.compose = elapsed_ms(start);

    let start = Instant::now();
    let stitched = attribute(canvas, &images, cfg.attribution);
    report.timings_ms.attribution = elapsed_ms(start);

    save_panorama(&output_path, &stitched)?;
    log::info!(
        "wrote {}x{} panorama to {}",
        stitched.canvas.width(),
        stitched.canvas.height(),
        output_path.display()
    );

    report.output_path = Some(output_path.to_string_lossy().into_owned());
    report.set_canvas(&stitched.canvas, &stitched.map);
    Ok(())
}
