use crate::detection::{contrast, denoise, preprocessing, segmentation};
use crate::error::Result;
use crate::pipeline::{PipelineContext, PipelineStep};
use image::GrayImage;

/// Min-max stretch to the full 8-bit range
pub struct NormalizeStep;

impl PipelineStep for NormalizeStep {
    fn process(&self, plane: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(preprocessing::normalize_min_max(plane))
    }

    fn name(&self) -> &str {
        "Normalize"
    }
}

/// Non-local means denoising
pub struct DenoiseStep {
    pub strength: f32,
    pub template_window: u32,
    pub search_window: u32,
}

impl PipelineStep for DenoiseStep {
    fn process(&self, plane: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(denoise::non_local_means(
            plane,
            self.strength,
            self.template_window,
            self.search_window,
        ))
    }

    fn name(&self) -> &str {
        "Denoise"
    }
}

/// Contrast-limited adaptive histogram equalisation
pub struct ClaheStep {
    pub clip_limit: f32,
    pub tile_grid: (u32, u32),
}

impl PipelineStep for ClaheStep {
    fn process(&self, plane: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(contrast::clahe(plane, self.clip_limit, self.tile_grid))
    }

    fn name(&self) -> &str {
        "Contrast Enhancement"
    }
}

/// Foreground where a pixel is darker than its Gaussian-weighted surroundings
pub struct AdaptiveThresholdStep {
    pub block_size: u32,
    pub offset: f32,
}

impl PipelineStep for AdaptiveThresholdStep {
    fn process(&self, plane: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(segmentation::adaptive_threshold(
            plane,
            self.block_size,
            self.offset,
        ))
    }

    fn name(&self) -> &str {
        "Adaptive Threshold"
    }
}

/// Remove specks and thin bridges from the foreground
pub struct OpeningStep {
    pub kernel_size: u32,
    pub iterations: u32,
}

impl PipelineStep for OpeningStep {
    fn process(&self, plane: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(segmentation::open_elliptical(
            plane,
            self.kernel_size,
            self.iterations,
        ))
    }

    fn name(&self) -> &str {
        "Morphological Opening"
    }
}

pub struct FillHolesStep;

impl PipelineStep for FillHolesStep {
    fn process(&self, plane: &GrayImage, _context: &PipelineContext) -> Result<GrayImage> {
        Ok(segmentation::fill_holes(plane))
    }

    fn name(&self) -> &str {
        "Hole Filling"
    }
}
