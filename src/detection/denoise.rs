//! Non-local means denoising for 8-bit planes.
//!
//! Each output pixel is a weighted average of the pixels in a search window
//! around it, weighted by how similar the patch (template window) around
//! each candidate is to the patch around the pixel itself. Flat regions are
//! smoothed while edges survive, since patches across an edge are dissimilar.
//!
//! Patch distances are evaluated one search offset at a time with an
//! integral image of squared differences, so the cost does not depend on the
//! template size.

use image::{GrayImage, Luma};

use crate::detection::preprocessing::reflect_101;

/// Weights below this value are treated as zero
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Largest possible mean squared difference between two 8-bit samples
const MAX_MEAN_DISTANCE: usize = 255 * 255;

pub fn non_local_means(
    plane: &GrayImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = (plane.width() as usize, plane.height() as usize);
    if width == 0 || height == 0 {
        return plane.clone();
    }

    let template_radius = (template_window / 2) as usize;
    let search_radius = (search_window / 2) as usize;
    let border = template_radius + search_radius;

    let padded = Padded::new(plane, border);
    let weights = distance_weights(strength);
    let template_area = ((2 * template_radius + 1) * (2 * template_radius + 1)) as u64;

    // Squared differences are needed for every template position, so the
    // difference field extends `template_radius` beyond the plane on each side.
    let diff_w = width + 2 * template_radius;
    let diff_h = height + 2 * template_radius;
    let mut integral = vec![0u64; (diff_w + 1) * (diff_h + 1)];

    let mut weighted_sum = vec![0f32; width * height];
    let mut weight_total = vec![0f32; width * height];

    let radius = search_radius as isize;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            // Integral image of (p - q)^2 where q is p shifted by (dx, dy)
            for j in 0..diff_h {
                let py = j + search_radius;
                let qy = (py as isize + dy) as usize;
                let mut row_sum = 0u64;
                for i in 0..diff_w {
                    let px = i + search_radius;
                    let qx = (px as isize + dx) as usize;
                    let d = padded.get(px, py) as i32 - padded.get(qx, qy) as i32;
                    row_sum += (d * d) as u64;
                    integral[(j + 1) * (diff_w + 1) + i + 1] =
                        integral[j * (diff_w + 1) + i + 1] + row_sum;
                }
            }

            for y in 0..height {
                for x in 0..width {
                    let (x0, y0) = (x, y);
                    let (x1, y1) = (x + 2 * template_radius + 1, y + 2 * template_radius + 1);
                    let ssd = integral[y1 * (diff_w + 1) + x1] + integral[y0 * (diff_w + 1) + x0]
                        - integral[y0 * (diff_w + 1) + x1]
                        - integral[y1 * (diff_w + 1) + x0];

                    let mean_distance =
                        ((ssd + template_area / 2) / template_area).min(MAX_MEAN_DISTANCE as u64);
                    let weight = weights[mean_distance as usize];
                    if weight == 0.0 {
                        continue;
                    }

                    let qx = (x + border) as isize + dx;
                    let qy = (y + border) as isize + dy;
                    let idx = y * width + x;
                    weighted_sum[idx] += weight * padded.get(qx as usize, qy as usize) as f32;
                    weight_total[idx] += weight;
                }
            }
        }
    }

    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        let idx = y as usize * width + x as usize;
        let total = weight_total[idx];
        // The zero offset always contributes weight 1, so `total` is positive
        let value = if total > 0.0 {
            weighted_sum[idx] / total
        } else {
            plane.get_pixel(x, y)[0] as f32
        };
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Lookup table from mean squared patch distance to weight
fn distance_weights(strength: f32) -> Vec<f32> {
    let h2 = strength * strength;
    (0..=MAX_MEAN_DISTANCE)
        .map(|d| {
            let w = (-(d as f32) / h2).exp();
            if w < WEIGHT_THRESHOLD { 0.0 } else { w }
        })
        .collect()
}

/// Plane copy with a reflect-101 border on every side
struct Padded {
    data: Vec<u8>,
    width: usize,
}

impl Padded {
    fn new(plane: &GrayImage, border: usize) -> Self {
        let (w, h) = (plane.width() as i64, plane.height() as i64);
        let width = w as usize + 2 * border;
        let height = h as usize + 2 * border;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let sy = reflect_101(y as i64 - border as i64, h);
            for x in 0..width {
                let sx = reflect_101(x as i64 - border as i64, w);
                data.push(plane.get_pixel(sx as u32, sy as u32)[0]);
            }
        }
        Self { data, width }
    }

    fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}
