use image::{GrayImage, Luma};
use std::sync::Arc;

use crate::config::PreprocessConfig;
use crate::detection::steps::{ClaheStep, DenoiseStep, NormalizeStep};
use crate::pipeline::{DebugConfig, Pipeline};

/// Stretch intensities so the darkest pixel maps to 0 and the brightest to 255.
///
/// A constant plane has no range to stretch and becomes all zeros.
pub fn normalize_min_max(plane: &GrayImage) -> GrayImage {
    let (min, max) = plane
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    let mut out = GrayImage::new(plane.width(), plane.height());
    if max <= min {
        return out;
    }

    let range = (max - min) as f32;
    for (src, dst) in plane.pixels().zip(out.pixels_mut()) {
        *dst = Luma([rescale(src[0] as f32, min as f32, range)]);
    }
    out
}

/// Min-max normalisation of raw samples (e.g. 16-bit or rescaled DICOM values)
/// into the 8-bit range. Non-finite samples map to 0.
pub fn normalize_samples(samples: &[f32]) -> Vec<u8> {
    let (min, max) = samples
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if !(max > min) {
        return vec![0; samples.len()];
    }

    let range = max - min;
    samples
        .iter()
        .map(|&v| if v.is_finite() { rescale(v, min, range) } else { 0 })
        .collect()
}

fn rescale(value: f32, min: f32, range: f32) -> u8 {
    ((value - min) * 255.0 / range).round().clamp(0.0, 255.0) as u8
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge
/// sample (`gfedcb|abcdefgh|gfedcba`).
pub(crate) fn reflect_101(index: i64, len: i64) -> i64 {
    if len <= 1 {
        return 0;
    }
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i;
        }
    }
}

/// Normalise → non-local means → CLAHE, applied to each plane
pub fn build_pipeline(config: &PreprocessConfig, debug: Option<DebugConfig>) -> Pipeline {
    Pipeline::new("preprocess")
        .with_debug(debug)
        .add_step(Arc::new(NormalizeStep))
        .add_step(Arc::new(DenoiseStep {
            strength: config.denoise_strength,
            template_window: config.template_window,
            search_window: config.search_window,
        }))
        .add_step(Arc::new(ClaheStep {
            clip_limit: config.clip_limit,
            tile_grid: config.tile_grid,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_plane_normalises_to_zero() {
        let plane = GrayImage::from_pixel(8, 8, Luma([128]));
        let out = normalize_min_max(&plane);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn range_is_stretched_to_full_scale() {
        let plane = GrayImage::from_raw(3, 1, vec![30, 115, 200]).unwrap();
        let out = normalize_min_max(&plane);
        assert_eq!(out.as_raw(), &vec![0, 128, 255]);
    }

    #[test]
    fn samples_normalise_with_wide_range() {
        let out = normalize_samples(&[-1000.0, 0.0, 3000.0, f32::NAN]);
        assert_eq!(out, vec![0, 64, 255, 0]);
        assert_eq!(normalize_samples(&[7.0, 7.0]), vec![0, 0]);
        assert!(normalize_samples(&[]).is_empty());
    }

    #[test]
    fn reflect_101_mirrors_without_edge_repeat() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-13, 2), 1);
        assert_eq!(reflect_101(4, 1), 0);
    }
}
