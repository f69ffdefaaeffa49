use crate::config::DecisionConfig;
use crate::detection::regions::find_regions;
use crate::error::{DetectionError, Result};
use crate::models::{BinaryMask, DetectionResult, GrayscaleImage, RegionStats};

/// Foreground extent and intensity statistics of `image` under `mask`.
///
/// An empty mask yields zero mean and deviation.
pub fn region_stats(image: &GrayscaleImage, mask: &BinaryMask) -> Result<RegionStats> {
    if image.shape() != mask.shape() {
        return Err(DetectionError::unsupported_dimensionality(format!(
            "mask shape {} does not match image shape {}",
            mask.shape(),
            image.shape()
        )));
    }

    let mut count = 0u64;
    let mut sum = 0f64;
    let mut sum_sq = 0f64;
    for (plane, mask_plane) in image.planes().iter().zip(mask.planes()) {
        for (px, m) in plane.pixels().zip(mask_plane.pixels()) {
            if m[0] == 1 {
                let v = px[0] as f64;
                count += 1;
                sum += v;
                sum_sq += v * v;
            }
        }
    }

    let total = mask.total_count();
    let (mean, std) = if count > 0 {
        let mean = sum / count as f64;
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        (mean, variance.sqrt())
    } else {
        (0.0, 0.0)
    };

    let regions = find_regions(mask, 1);

    Ok(RegionStats {
        tumor_ratio: if total > 0 { count as f64 / total as f64 } else { 0.0 },
        mean_intensity: mean,
        std_intensity: std,
        foreground_pixels: count,
        total_pixels: total,
        region_count: regions.len(),
        largest_region_pixels: regions.first().map_or(0, |r| r.pixel_count),
        largest_region: regions.first().map(|r| r.summary()),
    })
}

/// Apply the decision policy: `(has_tumor, confidence)`.
///
/// Both thresholds are strict. Confidence grows with region extent and
/// internal heterogeneity and is capped at `max_confidence`.
pub fn decide(stats: &RegionStats, policy: &DecisionConfig) -> (bool, f64) {
    let has_tumor = stats.tumor_ratio > policy.min_tumor_ratio
        && stats.std_intensity > policy.min_std_intensity;
    let confidence =
        (stats.tumor_ratio * policy.ratio_weight + stats.std_intensity).min(policy.max_confidence);
    (has_tumor, confidence)
}

pub fn analyze(
    image: &GrayscaleImage,
    mask: &BinaryMask,
    policy: &DecisionConfig,
) -> Result<DetectionResult> {
    let stats = region_stats(image, mask)?;
    let (has_tumor, confidence) = decide(&stats, policy);
    Ok(DetectionResult {
        has_tumor,
        confidence,
        image_shape: Some(image.shape()),
        stats: Some(stats),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn stats(ratio: f64, std: f64) -> RegionStats {
        RegionStats {
            tumor_ratio: ratio,
            std_intensity: std,
            ..RegionStats::default()
        }
    }

    #[test]
    fn empty_mask_gives_zero_confidence() {
        let image =
            GrayscaleImage::from_plane(GrayImage::from_fn(8, 8, |x, _| Luma([x as u8 * 30]))).unwrap();
        let mask = BinaryMask::from_planes(vec![GrayImage::new(8, 8)], &image).unwrap();
        let result = analyze(&image, &mask, &DecisionConfig::default()).unwrap();
        assert!(!result.has_tumor);
        assert_eq!(result.confidence, 0.0);
        let stats = result.stats.unwrap();
        assert_eq!(stats.mean_intensity, 0.0);
        assert_eq!(stats.std_intensity, 0.0);
        assert_eq!(stats.region_count, 0);
        assert!(stats.largest_region.is_none());
    }

    #[test]
    fn foreground_statistics() {
        let image = GrayscaleImage::from_plane(GrayImage::from_raw(4, 1, vec![10, 20, 30, 250]).unwrap())
            .unwrap();
        let mask_plane = GrayImage::from_raw(4, 1, vec![1, 1, 1, 0]).unwrap();
        let mask = BinaryMask::from_planes(vec![mask_plane], &image).unwrap();
        let stats = region_stats(&image, &mask).unwrap();
        assert_eq!(stats.foreground_pixels, 3);
        assert!((stats.tumor_ratio - 0.75).abs() < 1e-12);
        assert!((stats.mean_intensity - 20.0).abs() < 1e-9);
        // population deviation of {10, 20, 30}
        assert!((stats.std_intensity - (200.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(stats.region_count, 1);
        assert_eq!(stats.largest_region_pixels, 3);
        let largest = stats.largest_region.unwrap();
        assert_eq!((largest.width, largest.height), (3, 1));
        assert_eq!(largest.center, (1, 0));
        assert!((largest.extent - 1.0).abs() < 1e-6);
        assert!((largest.aspect_ratio - 3.0).abs() < 1e-6);
    }

    #[test]
    fn thresholds_are_strict() {
        let policy = DecisionConfig::default();
        assert!(!decide(&stats(0.01, 80.0), &policy).0);
        assert!(!decide(&stats(0.5, 20.0), &policy).0);
        assert!(decide(&stats(0.0101, 20.01), &policy).0);
    }

    #[test]
    fn confidence_is_monotonic_and_capped() {
        let policy = DecisionConfig::default();
        let ratios = [0.0, 0.001, 0.01, 0.02, 0.05, 0.2, 1.0];
        let stds = [0.0, 5.0, 20.0, 21.0, 60.0, 127.5];

        for &std in &stds {
            let mut last = f64::NEG_INFINITY;
            for &ratio in &ratios {
                let (_, c) = decide(&stats(ratio, std), &policy);
                assert!(c >= last);
                assert!(c <= 100.0);
                last = c;
            }
        }
        for &ratio in &ratios {
            let mut last = f64::NEG_INFINITY;
            for &std in &stds {
                let (_, c) = decide(&stats(ratio, std), &policy);
                assert!(c >= last);
                assert!(c <= 100.0);
                last = c;
            }
        }
        assert_eq!(decide(&stats(1.0, 127.5), &policy).1, 100.0);
        assert!((decide(&stats(0.02, 10.0), &policy).1 - 30.0).abs() < 1e-9);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let image = GrayscaleImage::from_plane(GrayImage::new(4, 4)).unwrap();
        let other = GrayscaleImage::from_plane(GrayImage::new(5, 4)).unwrap();
        let mask = BinaryMask::from_planes(vec![GrayImage::new(5, 4)], &other).unwrap();
        assert!(region_stats(&image, &mask).is_err());
    }
}
