use crate::error::{DetectionError, Result};
use crate::models::GrayscaleImage;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent; it is created if missing
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if output_dir.exists() {
            let mut entries = std::fs::read_dir(&output_dir)?;
            if entries.next().is_some() {
                return Err(DetectionError::invalid_config(format!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }
}

/// Context available to all pipeline steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// A transformation applied independently to every plane of an image.
///
/// Steps must preserve plane dimensions.
pub trait PipelineStep: Send + Sync {
    fn process(&self, plane: &GrayImage, context: &PipelineContext) -> Result<GrayImage>;

    /// Human-readable name for this step (used in logs and debug folders)
    fn name(&self) -> &str;
}

/// Composable sequence of per-plane steps.
///
/// Volumes and single images go through the same iteration path: the stack
/// of planes is pushed through each step in turn.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Dump every step's output planes below `debug.output_dir/<pipeline name>/`
    pub fn with_debug(mut self, debug: Option<DebugConfig>) -> Self {
        self.context.debug = debug;
        self
    }

    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step on every plane
    pub fn run(&self, input: &GrayscaleImage) -> Result<GrayscaleImage> {
        self.run_partial(input, self.steps.len())
    }

    /// Run only the first `num_steps` steps (useful for inspecting intermediates)
    pub fn run_partial(&self, input: &GrayscaleImage, num_steps: usize) -> Result<GrayscaleImage> {
        let mut current = input.clone();

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(
                pipeline = %self.name,
                step = step.name(),
                planes = current.planes().len(),
                "running step"
            );

            let planes = current
                .planes()
                .iter()
                .map(|plane| step.process(plane, &self.context))
                .collect::<Result<Vec<_>>>()?;
            current = current.with_planes(planes)?;

            if let Some(debug_config) = &self.context.debug {
                self.save_debug_output(&debug_config.output_dir, step_idx, step.name(), &current)?;
            }
        }

        Ok(current)
    }

    fn save_debug_output(
        &self,
        root: &Path,
        step_idx: usize,
        step_name: &str,
        image: &GrayscaleImage,
    ) -> Result<()> {
        let step_dir_name = format!(
            "{:02}_{}",
            step_idx + 1,
            step_name.to_lowercase().replace(' ', "_")
        );
        let step_dir = root.join(&self.name).join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        for (idx, plane) in image.planes().iter().enumerate() {
            plane.save(step_dir.join(format!("{:02}.png", idx + 1)))?;
        }

        debug!(
            "saved {} debug images to {}/{}",
            image.planes().len(),
            self.name,
            step_dir_name
        );
        Ok(())
    }
}
