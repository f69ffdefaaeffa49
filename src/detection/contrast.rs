//! Contrast-limited adaptive histogram equalisation (CLAHE)

use image::{GrayImage, Luma};

use crate::detection::preprocessing::reflect_101;

const BINS: usize = 256;

/// Equalise each tile of a `tile_grid` (columns, rows) grid separately, with
/// histogram bins clipped at `clip_limit` times the uniform bin height, and
/// blend neighbouring tile mappings bilinearly.
pub fn clahe(plane: &GrayImage, clip_limit: f32, tile_grid: (u32, u32)) -> GrayImage {
    let (width, height) = plane.dimensions();
    let tiles_x = tile_grid.0.max(1);
    let tiles_y = tile_grid.1.max(1);
    if width == 0 || height == 0 {
        return plane.clone();
    }

    // Planes that don't divide evenly are treated as reflect-padded
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);
    let tile_area = tile_w * tile_h;

    let limit = ((clip_limit * tile_area as f32 / BINS as f32) as u32).max(1);
    let scale = 255.0 / tile_area as f32;

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; BINS];
            for yy in 0..tile_h {
                let y = reflect_101((ty * tile_h + yy) as i64, height as i64) as u32;
                for xx in 0..tile_w {
                    let x = reflect_101((tx * tile_w + xx) as i64, width as i64) as u32;
                    hist[plane.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            clip_histogram(&mut hist, limit);
            luts.push(histogram_lut(&hist, scale));
        }
    }

    let x_weights: Vec<_> = (0..width)
        .map(|x| neighbours(x, tile_w, tiles_x))
        .collect();
    let y_weights: Vec<_> = (0..height)
        .map(|y| neighbours(y, tile_h, tiles_y))
        .collect();

    GrayImage::from_fn(width, height, |x, y| {
        let v = plane.get_pixel(x, y)[0] as usize;
        let (tx1, tx2, xa) = x_weights[x as usize];
        let (ty1, ty2, ya) = y_weights[y as usize];
        let lut = |tx: usize, ty: usize| luts[ty * tiles_x as usize + tx][v] as f32;

        let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
        let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
        let value = top * (1.0 - ya) + bottom * ya;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Cap every bin at `limit` and spread the excess over all bins
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / BINS as u32;
    let mut residual = clipped - batch * BINS as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (BINS / residual as usize).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

fn histogram_lut(hist: &[u32; BINS], scale: f32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Neighbouring tile indices along one axis and the weight of the second one
fn neighbours(pos: u32, tile_size: u32, tiles: u32) -> (usize, usize, f32) {
    let f = pos as f32 / tile_size as f32 - 0.5;
    let first = f.floor();
    let weight = f - first;
    let t1 = (first as i64).max(0) as usize;
    let t2 = ((first as i64 + 1).min(tiles as i64 - 1)).max(0) as usize;
    (t1, t2, weight)
}
