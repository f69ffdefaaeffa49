mod common;

use common::*;
use tumorscan::{SourceFormat, load_image};

const SIDE: u16 = 16;

/// Two frames: a flat 200 frame and a frame split between 100 and 300
fn two_frame_volume() -> Vec<u16> {
    let frame_len = SIDE as usize * SIDE as usize;
    let mut samples = vec![200u16; frame_len];
    samples.extend((0..frame_len).map(|i| if i % (SIDE as usize) < 8 { 100 } else { 300 }));
    samples
}

#[test]
fn multi_frame_dicom_loads_as_volume() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = write_dicom(
        dir.path(),
        "series.dcm",
        SIDE,
        SIDE,
        2,
        DicomPixels::Mono16(two_frame_volume()),
    )?;

    let image = load_image(&path)?;

    assert_eq!(
        image.shape(),
        ImageShape {
            width: SIDE as u32,
            height: SIDE as u32,
            slices: Some(2)
        }
    );
    assert_eq!(image.planes().len(), 2);
    Ok(())
}

#[test]
fn dicom_volume_is_normalised_as_a_whole() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = write_dicom(
        dir.path(),
        "series.dcm",
        SIDE,
        SIDE,
        2,
        DicomPixels::Mono16(two_frame_volume()),
    )?;

    let image = load_image(&path)?;
    let [flat, split] = image.planes() else {
        panic!("expected two planes");
    };

    // 200 sits halfway between the volume extremes 100 and 300
    assert!(flat.pixels().all(|p| p[0] == 128));
    assert_eq!(split.get_pixel(0, 0)[0], 0);
    assert_eq!(split.get_pixel(SIDE as u32 - 1, 0)[0], 255);
    Ok(())
}

#[test]
fn dicom_is_recognised_without_extension() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = write_dicom(
        dir.path(),
        "series.bin",
        SIDE,
        SIDE,
        2,
        DicomPixels::Mono16(two_frame_volume()),
    )?;

    assert_eq!(SourceFormat::detect(&path), SourceFormat::Dicom);
    assert_eq!(load_image(&path)?.shape().slices, Some(2));
    Ok(())
}

#[test]
fn colour_dicom_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let bytes = vec![90u8; SIDE as usize * SIDE as usize * 3];
    let path = write_dicom(
        dir.path(),
        "colour.dcm",
        SIDE,
        SIDE,
        1,
        DicomPixels::Rgb8(bytes),
    )?;

    let err = load_image(&path).unwrap_err();
    assert!(matches!(err, DetectionError::UnsupportedDimensionality(_)));

    // the detector degrades instead of failing
    let result = TumorDetector::new().detect(&path)?;
    assert!(result.is_degraded());
    Ok(())
}

#[test]
fn dicom_volume_runs_through_detection() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = write_dicom(
        dir.path(),
        "series.dcm",
        SIDE,
        SIDE,
        2,
        DicomPixels::Mono16(two_frame_volume()),
    )?;

    let result = TumorDetector::new().detect(&path)?;

    assert!(!result.is_degraded());
    let stats = result.stats.expect("stats for a loaded volume");
    assert_eq!(stats.total_pixels, 2 * SIDE as u64 * SIDE as u64);
    assert!(result.confidence <= 100.0);
    Ok(())
}
