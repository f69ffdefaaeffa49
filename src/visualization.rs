//! Diagnostic images written next to a detection result.
//!
//! Works from the raw input independently of the detection pipeline and
//! shares only the loader and the min-max normalisation with it.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::{Contour, find_contours};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use std::path::Path;
use tracing::{debug, info};

use crate::config::VisualizationConfig;
use crate::detection::loader::load_image;
use crate::detection::preprocessing::normalize_min_max;
use crate::detection::segmentation::sigma_for_kernel;
use crate::error::{DetectionError, Result};
use crate::models::VisualizationArtifacts;

/// Write `<base_name>_original.png`, `_contours.png` and `_heatmap.png` into
/// `output_dir` (created if missing). Multi-slice inputs are visualised from
/// their first slice.
///
/// Nothing is written when the input cannot be decoded.
pub fn generate_visualizations(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    base_name: &str,
    config: &VisualizationConfig,
) -> Result<VisualizationArtifacts> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    let image = load_image(input)?;
    let first = image
        .planes()
        .first()
        .ok_or_else(|| DetectionError::unsupported_dimensionality("image has no planes"))?;
    let normalized = normalize_min_max(first);

    let contours = contour_overlay(&normalized, config);
    let heatmap = heatmap(&normalized, config.heatmap_kernel);

    std::fs::create_dir_all(output_dir)?;
    let artifacts = VisualizationArtifacts::new(output_dir, base_name);
    normalized.save(&artifacts.original)?;
    contours.save(&artifacts.contours)?;
    heatmap.save(&artifacts.heatmap)?;

    info!(
        input = %input.display(),
        output_dir = %output_dir.display(),
        "visualizations written"
    );
    Ok(artifacts)
}

/// Canny edges traced into nested contours and drawn over the image
pub fn contour_overlay(normalized: &GrayImage, config: &VisualizationConfig) -> RgbImage {
    let edges = canny(normalized, config.canny_low, config.canny_high);
    let contours: Vec<Contour<i32>> = find_contours(&edges);
    debug!(count = contours.len(), "contours traced");

    let mut overlay = RgbImage::from_fn(normalized.width(), normalized.height(), |x, y| {
        let v = normalized.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });
    let color = Rgb(config.contour_color);
    for contour in &contours {
        for point in &contour.points {
            if point.x >= 0
                && point.y >= 0
                && (point.x as u32) < overlay.width()
                && (point.y as u32) < overlay.height()
            {
                overlay.put_pixel(point.x as u32, point.y as u32, color);
            }
        }
    }
    overlay
}

/// Gaussian-smoothed intensities mapped through the jet palette
pub fn heatmap(normalized: &GrayImage, kernel_size: u32) -> RgbImage {
    let blurred = gaussian_blur_f32(normalized, sigma_for_kernel(kernel_size));
    RgbImage::from_fn(blurred.width(), blurred.height(), |x, y| {
        jet(blurred.get_pixel(x, y)[0])
    })
}

/// Blue → cyan → yellow → red heat palette
pub fn jet(value: u8) -> Rgb<u8> {
    let t = value as f32 / 255.0;
    let channel = |center: f32| {
        let v = 1.5 - (4.0 * t - center).abs();
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}
