pub mod analysis;
pub mod contrast;
pub mod denoise;
pub mod loader;
pub mod preprocessing;
pub mod regions;
pub mod segmentation;
pub mod steps;

use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use crate::config::DetectorConfig;
use crate::error::Result;
use crate::models::{BinaryMask, DetectionResult, GrayscaleImage};
use crate::pipeline::{DebugConfig, Pipeline};

/// Load → preprocess → segment → analyze.
///
/// Holds only immutable configuration, so one detector can serve concurrent
/// callers as long as they use distinct debug directories.
#[derive(Clone)]
pub struct TumorDetector {
    config: DetectorConfig,
    preprocessor: Pipeline,
    segmenter: Pipeline,
}

impl TumorDetector {
    pub fn new() -> Self {
        Self::assemble(DetectorConfig::default(), None)
    }

    pub fn with_config(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, None))
    }

    /// Save every intermediate plane below `output_dir`.
    /// The directory must be empty or non-existent.
    pub fn with_debug(self, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let debug = DebugConfig::new(output_dir)?;
        Ok(Self::assemble(self.config, Some(debug)))
    }

    fn assemble(config: DetectorConfig, debug: Option<DebugConfig>) -> Self {
        let preprocessor = preprocessing::build_pipeline(&config.preprocess, debug.clone());
        let segmenter = segmentation::build_pipeline(&config.segmentation, debug);
        Self {
            config,
            preprocessor,
            segmenter,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &Pipeline {
        &self.preprocessor
    }

    pub fn segmenter(&self) -> &Pipeline {
        &self.segmenter
    }

    /// Run the full pipeline on a file.
    ///
    /// An input that cannot be loaded yields the negative, zero-confidence
    /// result instead of an error. Failures after loading still propagate.
    pub fn detect(&self, path: impl AsRef<Path>) -> Result<DetectionResult> {
        let path = path.as_ref();
        let _span = info_span!("detect", path = %path.display()).entered();

        let image = match loader::load_image(path) {
            Ok(image) => image,
            Err(err) if err.is_load_failure() => {
                warn!("detection skipped: {err}");
                return Ok(DetectionResult::degraded());
            }
            Err(err) => return Err(err),
        };
        self.detect_image(&image)
    }

    /// Run preprocess → segment → analyze on an already loaded image
    pub fn detect_image(&self, image: &GrayscaleImage) -> Result<DetectionResult> {
        let processed = self.preprocess(image)?;
        let mask = self.segment(&processed)?;
        let result = self.analyze(&processed, &mask)?;

        info!(
            shape = %image.shape(),
            has_tumor = result.has_tumor,
            confidence = result.confidence,
            "detection finished"
        );
        Ok(result)
    }

    pub fn preprocess(&self, image: &GrayscaleImage) -> Result<GrayscaleImage> {
        self.preprocessor.run(image)
    }

    pub fn segment(&self, processed: &GrayscaleImage) -> Result<BinaryMask> {
        segmentation::segment(&self.segmenter, processed)
    }

    pub fn analyze(&self, processed: &GrayscaleImage, mask: &BinaryMask) -> Result<DetectionResult> {
        analysis::analyze(processed, mask, &self.config.decision)
    }
}

impl Default for TumorDetector {
    fn default() -> Self {
        Self::new()
    }
}
