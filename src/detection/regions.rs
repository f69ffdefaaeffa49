use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashMap;

use crate::models::{BinaryMask, Region};

/// Label 8-connected foreground regions in every mask plane.
///
/// Regions smaller than `min_area` pixels are dropped. The result is sorted
/// by decreasing size.
pub fn find_regions(mask: &BinaryMask, min_area: u32) -> Vec<Region> {
    let mut found = Vec::new();

    for (plane_idx, plane) in mask.planes().iter().enumerate() {
        let labeled = connected_components(plane, Connectivity::Eight, Luma([0u8]));

        // label -> (min_x, min_y, max_x, max_y, count)
        let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
        for (x, y, label) in labeled.enumerate_pixels() {
            let label_val = label[0];
            if label_val == 0 {
                continue;
            }
            regions
                .entry(label_val)
                .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                    *min_x = (*min_x).min(x);
                    *min_y = (*min_y).min(y);
                    *max_x = (*max_x).max(x);
                    *max_y = (*max_y).max(y);
                    *count += 1;
                })
                .or_insert((x, y, x, y, 1));
        }

        found.extend(
            regions
                .into_iter()
                .map(|(label, (min_x, min_y, max_x, max_y, count))| Region {
                    plane: plane_idx,
                    label,
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                    pixel_count: count,
                })
                .filter(|r| r.pixel_count >= min_area),
        );
    }

    found.sort_by(|a, b| {
        b.pixel_count
            .cmp(&a.pixel_count)
            .then(a.plane.cmp(&b.plane))
            .then(a.label.cmp(&b.label))
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GrayscaleImage;
    use image::GrayImage;

    #[test]
    fn separate_blobs_become_separate_regions() {
        let mut plane = GrayImage::new(20, 20);
        for y in 2..6 {
            for x in 2..6 {
                plane.put_pixel(x, y, Luma([1]));
            }
        }
        for y in 10..13 {
            for x in 12..18 {
                plane.put_pixel(x, y, Luma([1]));
            }
        }
        plane.put_pixel(0, 19, Luma([1]));

        let image = GrayscaleImage::from_plane(GrayImage::new(20, 20)).unwrap();
        let mask = BinaryMask::from_planes(vec![plane], &image).unwrap();

        let all = find_regions(&mask, 1);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].pixel_count, 18);
        assert_eq!((all[0].min_x, all[0].max_x), (12, 17));
        assert_eq!(all[1].pixel_count, 16);

        let large = find_regions(&mask, 2);
        assert_eq!(large.len(), 2);
    }

    #[test]
    fn diagonal_neighbours_are_connected() {
        let plane = GrayImage::from_raw(3, 3, vec![1, 0, 0, 0, 1, 0, 0, 0, 1]).unwrap();
        let image = GrayscaleImage::from_plane(GrayImage::new(3, 3)).unwrap();
        let mask = BinaryMask::from_planes(vec![plane], &image).unwrap();
        let regions = find_regions(&mask, 1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area(), 3);
    }
}
