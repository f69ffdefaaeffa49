pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod visualization;

pub use config::DetectorConfig;
pub use detection::TumorDetector;
pub use detection::loader::{SourceFormat, load_image};
pub use error::{DetectionError, Result};
pub use models::{
    BinaryMask, DetectionResult, GrayscaleImage, ImageShape, Region, RegionStats, RegionSummary,
    VisualizationArtifacts,
};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineStep};
pub use visualization::generate_visualizations;
