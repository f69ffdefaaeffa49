use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CANVAS: u32 = 256;
pub const BACKGROUND: u8 = 30;
pub const LESION: u8 = 200;

/// Uniform mid-gray canvas
pub fn uniform_image(size: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(size, size, Luma([value]))
}

/// Dark canvas with a bright square of side `side` centred in it
pub fn square_on_background(size: u32, side: u32) -> GrayImage {
    let start = (size - side) / 2;
    let end = start + side;
    GrayImage::from_fn(size, size, |x, y| {
        let inside = (start..end).contains(&x) && (start..end).contains(&y);
        Luma([if inside { LESION } else { BACKGROUND }])
    })
}

/// Smooth gradient with ripples, exercising every stage without flat areas
pub fn textured_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let ripple = ((x as f32 * 0.4).sin() * (y as f32 * 0.3).cos() * 40.0) as i32;
        let base = (x * 120 / width.max(1) + y * 60 / height.max(1)) as i32;
        Luma([(base + ripple + 50).clamp(0, 255) as u8])
    })
}

/// Saves `image` as PNG inside a new temp dir; keep the dir alive while using the path
pub fn write_png(image: &GrayImage, file_name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join(file_name);
    image.save(&path).expect("Failed to save test image");
    (dir, path)
}

/// Names of the files directly inside `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|entry| {
            entry
                .expect("Failed to read entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Pixel layout of a synthetic DICOM file
pub enum DicomPixels {
    /// MONOCHROME2, 16 bits per sample, frames stored back to back
    Mono16(Vec<u16>),
    /// Interleaved RGB, 8 bits per sample
    Rgb8(Vec<u8>),
}

/// Writes a minimal secondary-capture DICOM file with `frames` frames
pub fn write_dicom(
    dir: &Path,
    file_name: &str,
    columns: u16,
    rows: u16,
    frames: u32,
    pixels: DicomPixels,
) -> anyhow::Result<PathBuf> {
    use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
    use dicom_dictionary_std::{tags, uids};
    use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

    let instance_uid = "2.25.112233445566778899";
    let mut obj = InMemDicomObject::new_empty();
    let mut put = |tag: Tag, vr: VR, value: PrimitiveValue| {
        obj.put(DataElement::new(tag, vr, value));
    };

    put(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
    );
    put(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(instance_uid));
    put(tags::ROWS, VR::US, PrimitiveValue::from(rows));
    put(tags::COLUMNS, VR::US, PrimitiveValue::from(columns));
    put(
        tags::NUMBER_OF_FRAMES,
        VR::IS,
        PrimitiveValue::from(frames.to_string()),
    );
    put(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0u16));

    match pixels {
        DicomPixels::Mono16(samples) => {
            put(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1u16));
            put(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("MONOCHROME2"),
            );
            put(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16u16));
            put(tags::BITS_STORED, VR::US, PrimitiveValue::from(16u16));
            put(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15u16));
            put(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(samples.into()));
        }
        DicomPixels::Rgb8(bytes) => {
            put(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(3u16));
            put(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("RGB"),
            );
            put(tags::PLANAR_CONFIGURATION, VR::US, PrimitiveValue::from(0u16));
            put(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(8u16));
            put(tags::BITS_STORED, VR::US, PrimitiveValue::from(8u16));
            put(tags::HIGH_BIT, VR::US, PrimitiveValue::from(7u16));
            put(tags::PIXEL_DATA, VR::OB, PrimitiveValue::U8(bytes.into()));
        }
    }

    let file = obj.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(instance_uid),
    )?;

    let path = dir.join(file_name);
    file.write_to_file(&path)?;
    Ok(path)
}
