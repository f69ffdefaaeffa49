use dicom_pixeldata::PixelDecoder;
use image::{GrayImage, ImageReader};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::detection::preprocessing::normalize_samples;
use crate::error::{DetectionError, Result};
use crate::models::GrayscaleImage;

/// DICOM Part 10 files carry "DICM" after a 128-byte preamble
const DICOM_MAGIC_OFFSET: usize = 128;
const DICOM_MAGIC: &[u8; 4] = b"DICM";

/// Container format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// PNG, JPEG, TIFF and anything else the `image` crate decodes
    Raster,
    /// DICOM, possibly multi-frame
    Dicom,
}

impl SourceFormat {
    /// DICOM by extension, or by magic bytes when the extension says nothing
    pub fn detect(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("dcm" | "dicom") => Self::Dicom,
            _ if has_dicom_magic(path) => Self::Dicom,
            _ => Self::Raster,
        }
    }
}

fn has_dicom_magic(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut header = [0u8; DICOM_MAGIC_OFFSET + 4];
    file.read_exact(&mut header).is_ok() && &header[DICOM_MAGIC_OFFSET..] == DICOM_MAGIC
}

/// Load a file as a grayscale image, detecting its format
pub fn load_image(path: impl AsRef<Path>) -> Result<GrayscaleImage> {
    let path = path.as_ref();
    load_image_as(path, SourceFormat::detect(path))
}

pub fn load_image_as(path: impl AsRef<Path>, format: SourceFormat) -> Result<GrayscaleImage> {
    let path = path.as_ref();
    let image = match format {
        SourceFormat::Raster => load_raster(path)?,
        SourceFormat::Dicom => load_dicom(path)?,
    };
    debug!(path = %path.display(), ?format, shape = %image.shape(), "image loaded");
    Ok(image)
}

fn load_raster(path: &Path) -> Result<GrayscaleImage> {
    let img = ImageReader::open(path)
        .map_err(|e| DetectionError::unreadable(path, e))?
        .with_guessed_format()
        .map_err(|e| DetectionError::unreadable(path, e))?
        .decode()
        .map_err(|e| DetectionError::unreadable(path, format!("failed to decode image: {e}")))?;

    GrayscaleImage::from_plane(img.to_luma8())
}

/// Every frame is read as rescaled samples and the whole volume is stretched
/// to 8 bits at once, so slices keep their relative brightness.
fn load_dicom(path: &Path) -> Result<GrayscaleImage> {
    let object = dicom_object::open_file(path).map_err(|e| DetectionError::unreadable(path, e))?;
    let pixel_data = object
        .decode_pixel_data()
        .map_err(|e| DetectionError::unreadable(path, e))?;

    let samples_per_pixel = pixel_data.samples_per_pixel();
    if samples_per_pixel != 1 {
        return Err(DetectionError::unsupported_dimensionality(format!(
            "{} samples per pixel; only single-channel images are supported",
            samples_per_pixel
        )));
    }

    let (columns, rows) = (pixel_data.columns(), pixel_data.rows());
    let frames = pixel_data.number_of_frames();
    let samples: Vec<f32> = pixel_data
        .to_vec()
        .map_err(|e| DetectionError::unreadable(path, e))?;

    let frame_len = columns as usize * rows as usize;
    if frame_len == 0 || samples.len() != frame_len * frames as usize {
        return Err(DetectionError::unsupported_dimensionality(format!(
            "pixel data holds {} samples, expected {} frames of {}x{}",
            samples.len(),
            frames,
            columns,
            rows
        )));
    }

    let normalized = normalize_samples(&samples);
    let planes = normalized
        .chunks_exact(frame_len)
        .map(|frame| {
            GrayImage::from_raw(columns, rows, frame.to_vec()).ok_or_else(|| {
                DetectionError::unsupported_dimensionality("frame buffer size mismatch")
            })
        })
        .collect::<Result<Vec<_>>>()?;

    GrayscaleImage::from_slices(planes)
}
