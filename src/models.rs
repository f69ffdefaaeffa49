use crate::error::{DetectionError, Result};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dimensions of a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
    /// Slice count for volumetric sources, `None` for plain raster images
    pub slices: Option<u32>,
}

impl ImageShape {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.slices.unwrap_or(1) as u64
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slices {
            Some(slices) => write!(f, "{}x{}x{}", self.width, self.height, slices),
            None => write!(f, "{}x{}", self.width, self.height),
        }
    }
}

/// An 8-bit grayscale image held as a stack of equally sized planes.
///
/// Plain raster images are a stack of one plane. Every processing stage
/// returns a new value instead of mutating its input.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleImage {
    planes: Vec<GrayImage>,
    slices: Option<u32>,
}

impl GrayscaleImage {
    /// Single-plane image from a raster source
    pub fn from_plane(plane: GrayImage) -> Result<Self> {
        Self::build(vec![plane], None)
    }

    /// Multi-slice image from a volumetric source
    pub fn from_slices(planes: Vec<GrayImage>) -> Result<Self> {
        let count = u32::try_from(planes.len()).map_err(|_| {
            DetectionError::unsupported_dimensionality("slice count does not fit in u32")
        })?;
        Self::build(planes, Some(count))
    }

    fn build(planes: Vec<GrayImage>, slices: Option<u32>) -> Result<Self> {
        let first = planes
            .first()
            .ok_or_else(|| DetectionError::unsupported_dimensionality("image has no planes"))?;
        let (width, height) = first.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectionError::unsupported_dimensionality(format!(
                "empty plane {width}x{height}"
            )));
        }
        if let Some((idx, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, p)| p.dimensions() != (width, height))
        {
            return Err(DetectionError::unsupported_dimensionality(format!(
                "plane {} is {}x{}, expected {}x{}",
                idx,
                plane.width(),
                plane.height(),
                width,
                height
            )));
        }
        Ok(Self { planes, slices })
    }

    /// Same slice layout, new plane contents.
    ///
    /// Only used by pipeline stages, which preserve plane dimensions.
    pub(crate) fn with_planes(&self, planes: Vec<GrayImage>) -> Result<Self> {
        let image = Self::build(planes, self.slices)?;
        if image.shape() != self.shape() {
            return Err(DetectionError::unsupported_dimensionality(format!(
                "stage changed shape from {} to {}",
                self.shape(),
                image.shape()
            )));
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.planes[0].width()
    }

    pub fn height(&self) -> u32 {
        self.planes[0].height()
    }

    pub fn shape(&self) -> ImageShape {
        ImageShape {
            width: self.width(),
            height: self.height(),
            slices: self.slices,
        }
    }

    pub fn planes(&self) -> &[GrayImage] {
        &self.planes
    }

    pub fn into_planes(self) -> Vec<GrayImage> {
        self.planes
    }

    pub fn pixel_count(&self) -> u64 {
        self.planes
            .iter()
            .map(|p| p.width() as u64 * p.height() as u64)
            .sum()
    }
}

/// Candidate-region mask with the same shape as the image it was derived from.
/// Every element is 0 or 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    planes: Vec<GrayImage>,
    shape: ImageShape,
}

impl BinaryMask {
    /// Binarise a plane stack (`non-zero -> 1`) against the image it belongs to
    pub fn from_planes(planes: Vec<GrayImage>, source: &GrayscaleImage) -> Result<Self> {
        if planes.len() != source.planes().len()
            || planes
                .iter()
                .any(|p| p.dimensions() != (source.width(), source.height()))
        {
            return Err(DetectionError::unsupported_dimensionality(format!(
                "mask shape does not match image shape {}",
                source.shape()
            )));
        }
        let planes = planes
            .into_iter()
            .map(|mut plane| {
                for p in plane.pixels_mut() {
                    p[0] = u8::from(p[0] != 0);
                }
                plane
            })
            .collect();
        Ok(Self {
            planes,
            shape: source.shape(),
        })
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn planes(&self) -> &[GrayImage] {
        &self.planes
    }

    pub fn is_set(&self, plane: usize, x: u32, y: u32) -> bool {
        self.planes
            .get(plane)
            .filter(|p| x < p.width() && y < p.height())
            .is_some_and(|p| p.get_pixel(x, y)[0] == 1)
    }

    pub fn foreground_count(&self) -> u64 {
        self.planes
            .iter()
            .map(|p| p.pixels().filter(|px| px[0] == 1).count() as u64)
            .sum()
    }

    pub fn total_count(&self) -> u64 {
        self.planes
            .iter()
            .map(|p| p.width() as u64 * p.height() as u64)
            .sum()
    }

    /// Planes scaled to 0/255 for saving or further morphology
    pub fn to_luma_planes(&self) -> Vec<GrayImage> {
        self.planes
            .iter()
            .map(|p| {
                GrayImage::from_fn(p.width(), p.height(), |x, y| {
                    Luma([p.get_pixel(x, y)[0] * 255])
                })
            })
            .collect()
    }
}

/// Connected foreground region found in one mask plane
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub plane: usize,
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u32 {
        self.pixel_count
    }

    /// Fraction of the bounding box covered by the region
    pub fn extent(&self) -> f32 {
        self.pixel_count as f32 / (self.width() * self.height()) as f32
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.min_x + self.max_x) / 2, (self.min_y + self.max_y) / 2)
    }

    pub fn summary(&self) -> RegionSummary {
        RegionSummary {
            plane: self.plane,
            width: self.width(),
            height: self.height(),
            center: self.center(),
            extent: self.extent(),
            aspect_ratio: self.aspect_ratio(),
        }
    }
}

/// Bounding-box geometry of a region, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub plane: usize,
    pub width: u32,
    pub height: u32,
    pub center: (u32, u32),
    pub extent: f32,
    pub aspect_ratio: f32,
}

/// Statistics of the segmented foreground
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionStats {
    pub tumor_ratio: f64,
    pub mean_intensity: f64,
    pub std_intensity: f64,
    pub foreground_pixels: u64,
    pub total_pixels: u64,
    pub region_count: usize,
    pub largest_region_pixels: u32,
    pub largest_region: Option<RegionSummary>,
}

/// Outcome of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub has_tumor: bool,
    /// Heuristic score, not a calibrated probability
    pub confidence: f64,
    /// `None` only for the fail-safe result of an unreadable input
    pub image_shape: Option<ImageShape>,
    pub stats: Option<RegionStats>,
}

impl DetectionResult {
    /// Negative, zero-confidence result reported when the input cannot be loaded
    pub fn degraded() -> Self {
        Self {
            has_tumor: false,
            confidence: 0.0,
            image_shape: None,
            stats: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.image_shape.is_none()
    }
}

/// Paths of the three diagnostic images written for one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationArtifacts {
    pub original: PathBuf,
    pub contours: PathBuf,
    pub heatmap: PathBuf,
}

impl VisualizationArtifacts {
    pub const ORIGINAL_SUFFIX: &'static str = "_original.png";
    pub const CONTOURS_SUFFIX: &'static str = "_contours.png";
    pub const HEATMAP_SUFFIX: &'static str = "_heatmap.png";

    pub fn new(output_dir: &Path, base_name: &str) -> Self {
        Self {
            original: output_dir.join(format!("{base_name}{}", Self::ORIGINAL_SUFFIX)),
            contours: output_dir.join(format!("{base_name}{}", Self::CONTOURS_SUFFIX)),
            heatmap: output_dir.join(format!("{base_name}{}", Self::HEATMAP_SUFFIX)),
        }
    }

    pub fn paths(&self) -> [&Path; 3] {
        [&self.original, &self.contours, &self.heatmap]
    }

    /// Paths as `<output dir name>/<file name>`, e.g. `results/scan_heatmap.png`
    pub fn relative_paths(&self) -> [String; 3] {
        self.paths().map(|path| {
            let file = path.file_name().map(Path::new).unwrap_or(path);
            let relative = match path.parent().and_then(Path::file_name) {
                Some(dir) => Path::new(dir).join(file),
                None => file.to_path_buf(),
            };
            relative.to_string_lossy().into_owned()
        })
    }
}
