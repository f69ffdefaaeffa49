#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from tumorscan for tests
pub use tumorscan::{
    BinaryMask, DetectionError, DetectionResult, DetectorConfig, GrayscaleImage, ImageShape,
    TumorDetector, VisualizationArtifacts,
};
