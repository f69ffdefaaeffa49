//! Tunable parameters of the detection pipeline.
//!
//! Every threshold the pipeline uses lives here so the decision policy can be
//! recalibrated without touching the processing code. Defaults are the values
//! the pipeline was tuned with; a JSON file may override any subset of fields.

use crate::error::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub preprocess: PreprocessConfig,
    pub segmentation: SegmentationConfig,
    pub decision: DecisionConfig,
    pub visualization: VisualizationConfig,
}

/// Denoising and contrast enhancement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Non-local means filter strength
    pub denoise_strength: f32,
    /// Side of the patch compared between pixels (odd)
    pub template_window: u32,
    /// Side of the area searched for similar patches (odd)
    pub search_window: u32,
    /// CLAHE clip limit, relative to a uniform histogram
    pub clip_limit: f32,
    /// CLAHE tile grid (columns, rows)
    pub tile_grid: (u32, u32),
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise_strength: 10.0,
            template_window: 7,
            search_window: 21,
            clip_limit: 3.0,
            tile_grid: (8, 8),
        }
    }
}

/// Thresholding and morphology parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Side of the Gaussian-weighted neighbourhood (odd)
    pub block_size: u32,
    /// Margin below the local mean a pixel must fall to become foreground
    pub offset: f32,
    /// Side of the elliptical structuring element (odd)
    pub kernel_size: u32,
    /// Number of times the opening is applied
    pub opening_iterations: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
            kernel_size: 5,
            opening_iterations: 2,
        }
    }
}

/// Heuristic decision policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Foreground fraction that must be exceeded
    pub min_tumor_ratio: f64,
    /// Foreground intensity standard deviation that must be exceeded
    pub min_std_intensity: f64,
    /// Multiplier applied to the ratio in the confidence score
    pub ratio_weight: f64,
    /// Upper bound of the confidence score
    pub max_confidence: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_tumor_ratio: 0.01,
            min_std_intensity: 20.0,
            ratio_weight: 1000.0,
            max_confidence: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Side of the smoothing kernel applied before the heat palette (odd)
    pub heatmap_kernel: u32,
    /// RGB colour used to draw contours
    pub contour_color: [u8; 3],
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            canny_low: 100.0,
            canny_high: 200.0,
            heatmap_kernel: 5,
            contour_color: [0, 255, 0],
        }
    }
}

impl DetectorConfig {
    /// Read a configuration from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            DetectionError::invalid_config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.preprocess;
        if !(p.denoise_strength.is_finite() && p.denoise_strength > 0.0) {
            return Err(DetectionError::invalid_config(
                "denoise_strength must be positive",
            ));
        }
        check_odd_window("template_window", p.template_window, 1)?;
        check_odd_window("search_window", p.search_window, 1)?;
        if !(p.clip_limit.is_finite() && p.clip_limit > 0.0) {
            return Err(DetectionError::invalid_config("clip_limit must be positive"));
        }
        if p.tile_grid.0 == 0 || p.tile_grid.1 == 0 {
            return Err(DetectionError::invalid_config("tile_grid must be non-zero"));
        }

        let s = &self.segmentation;
        check_odd_window("block_size", s.block_size, 3)?;
        check_odd_window("kernel_size", s.kernel_size, 1)?;
        if !s.offset.is_finite() {
            return Err(DetectionError::invalid_config("offset must be finite"));
        }

        let d = &self.decision;
        let finite = [
            d.min_tumor_ratio,
            d.min_std_intensity,
            d.ratio_weight,
            d.max_confidence,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(DetectionError::invalid_config(
                "decision thresholds must be finite",
            ));
        }
        if d.ratio_weight < 0.0 {
            return Err(DetectionError::invalid_config(
                "ratio_weight must not be negative",
            ));
        }

        let v = &self.visualization;
        if !(v.canny_low.is_finite() && v.canny_high.is_finite()) || v.canny_low > v.canny_high {
            return Err(DetectionError::invalid_config(
                "canny thresholds must be finite with low <= high",
            ));
        }
        check_odd_window("heatmap_kernel", v.heatmap_kernel, 1)?;
        Ok(())
    }
}

fn check_odd_window(name: &str, value: u32, min: u32) -> Result<()> {
    if value < min || value % 2 == 0 {
        return Err(DetectionError::invalid_config(format!(
            "{name} must be odd and at least {min}, got {value}"
        )));
    }
    Ok(())
}
