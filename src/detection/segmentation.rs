use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_open};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SegmentationConfig;
use crate::detection::steps::{AdaptiveThresholdStep, FillHolesStep, OpeningStep};
use crate::error::Result;
use crate::models::{BinaryMask, GrayscaleImage};
use crate::pipeline::{DebugConfig, Pipeline};

const FOREGROUND: u8 = 255;

/// Gaussian sigma matching a kernel size when none is given explicitly
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian kernel of odd size `kernel_size`
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(kernel_size);
    let center = (kernel_size / 2) as f32;
    let raw: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Gaussian-weighted neighbourhood mean of every pixel, edges replicated
pub fn local_gaussian_mean(plane: &GrayImage, block_size: u32) -> Vec<f32> {
    let (width, height) = (plane.width() as usize, plane.height() as usize);
    let kernel = gaussian_kernel(block_size);
    let radius = (block_size / 2) as isize;
    let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;

    let mut horizontal = vec![0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            horizontal[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sx = clamp(x as isize + k as isize - radius, width);
                    w * plane.get_pixel(sx as u32, y as u32)[0] as f32
                })
                .sum();
        }
    }

    let mut mean = vec![0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            mean[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sy = clamp(y as isize + k as isize - radius, height);
                    w * horizontal[sy * width + x]
                })
                .sum();
        }
    }
    mean
}

/// Mark pixels at least `offset` darker than their local Gaussian-weighted
/// mean. The mean is rounded to 8 bits before comparing. Output is 0/255.
pub fn adaptive_threshold(plane: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let mean = local_gaussian_mean(plane, block_size);
    let width = plane.width() as usize;
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        let local = mean[y as usize * width + x as usize].round();
        let value = plane.get_pixel(x, y)[0] as f32;
        Luma([if value <= local - offset { FOREGROUND } else { 0 }])
    })
}

/// Filled ellipse inscribed in a `size` x `size` square (0/255)
pub fn elliptical_kernel(size: u32) -> GrayImage {
    let r = (size / 2) as i32;
    let c = r;
    let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
    let mut kernel = GrayImage::new(size, size);
    for i in 0..size as i32 {
        let dy = i - r;
        if dy.abs() > r {
            continue;
        }
        let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
        let j1 = (c - dx).max(0);
        let j2 = (c + dx + 1).min(size as i32);
        for j in j1..j2 {
            kernel.put_pixel(j as u32, i as u32, Luma([FOREGROUND]));
        }
    }
    kernel
}

/// Morphological opening with an elliptical element, repeated `iterations` times
pub fn open_elliptical(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let center = (kernel_size / 2) as u8;
    let element = Mask::from_image(&elliptical_kernel(kernel_size), center, center);
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = grayscale_open(&out, &element);
    }
    out
}

/// Turn background pockets fully enclosed by foreground into foreground.
///
/// Background is traced with 4-connectivity; any background component that
/// reaches the plane border is outside every region and is left untouched.
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut background = GrayImage::new(width, height);
    for (src, dst) in mask.pixels().zip(background.pixels_mut()) {
        *dst = Luma([if src[0] == 0 { FOREGROUND } else { 0 }]);
    }

    let labels = connected_components(&background, Connectivity::Four, Luma([0u8]));

    let mut exterior = HashSet::new();
    for x in 0..width {
        exterior.insert(labels.get_pixel(x, 0)[0]);
        exterior.insert(labels.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        exterior.insert(labels.get_pixel(0, y)[0]);
        exterior.insert(labels.get_pixel(width - 1, y)[0]);
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y)[0];
        let filled = mask.get_pixel(x, y)[0] != 0 || (label != 0 && !exterior.contains(&label));
        Luma([if filled { FOREGROUND } else { 0 }])
    })
}

/// Adaptive threshold → opening → hole filling, applied to each plane
pub fn build_pipeline(config: &SegmentationConfig, debug: Option<DebugConfig>) -> Pipeline {
    Pipeline::new("segment")
        .with_debug(debug)
        .add_step(Arc::new(AdaptiveThresholdStep {
            block_size: config.block_size,
            offset: config.offset,
        }))
        .add_step(Arc::new(OpeningStep {
            kernel_size: config.kernel_size,
            iterations: config.opening_iterations,
        }))
        .add_step(Arc::new(FillHolesStep))
}

/// Run the segmentation pipeline and binarise its output
pub fn segment(pipeline: &Pipeline, image: &GrayscaleImage) -> Result<BinaryMask> {
    let planes = pipeline.run(image)?.into_planes();
    BinaryMask::from_planes(planes, image)
}
