// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Intensity transforms on grayscale page bitmaps: adaptive binarization and
// contrast-limited adaptive histogram equalisation (CLAHE).

use image::{GrayImage, Luma};

// -- Binarization -------------------------------------------------------------

/// Local-mean adaptive threshold.
///
/// For each pixel the threshold is the mean intensity of the
/// `(2 * block_radius + 1)` square around it, minus `c`. Darker pixels become
/// black (0), the rest white (255).
pub fn adaptive_threshold(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = compute_integral_image(gray);

    GrayImage::from_fn(width, height, |x, y| {
        let local_mean = region_mean(&integral, width, height, x, y, block_radius);
        let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
        if gray.get_pixel(x, y).0[0] < threshold {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    })
}

/// Invert a binary image when more than half of it is white, so foreground
/// strokes end up as the non-zero minority. Returns whether it inverted.
pub fn invert_if_majority_white(binary: &mut GrayImage) -> bool {
    let total = binary.width() as u64 * binary.height() as u64;
    let white = binary.pixels().filter(|p| p.0[0] > 127).count() as u64;
    if total > 0 && white * 2 > total {
        image::imageops::invert(binary);
        true
    } else {
        false
    }
}

/// Summed-area table with a zero-padded border, `(width+1) x (height+1)`.
///
/// `integral[y * (width+1) + x]` holds the sum over `[0, x) x [0, y)`.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean over the square of `radius` around `(cx, cy)`, clipped to the image.
fn region_mean(integral: &[u64], img_width: u32, img_height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

// -- CLAHE --------------------------------------------------------------------

/// Contrast-limited adaptive histogram equalisation.
///
/// The image is split into a `tiles x tiles` grid; each tile's histogram is
/// clipped at `clip_limit` times the uniform bin height, the excess spread
/// evenly over all bins, and the resulting mapping bilinearly interpolated
/// between neighbouring tile centres.
pub fn clahe(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32, value: u8| luts[(ty * tiles_x + tx) as usize][value as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y).0[0];
        let (tx0, tx1, ax) = tile_neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = tile_neighbours(y, tile_h, tiles_y);
        let top = lut_at(tx0, ty0, value) * (1.0 - ax) + lut_at(tx1, ty0, value) * ax;
        let bottom = lut_at(tx0, ty1, value) * (1.0 - ax) + lut_at(tx1, ty1, value) * ax;
        let mapped = top * (1.0 - ay) + bottom * ay;
        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clipped-histogram equalisation mapping for one tile.
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [f32; 256] {
    let mut histogram = [0f32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[gray.get_pixel(x, y).0[0] as usize] += 1.0;
        }
    }
    let pixels = ((x1 - x0) * (y1 - y0)) as f32;
    let limit = (clip_limit * pixels / 256.0).max(1.0);

    let mut excess = 0.0;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256.0;

    let mut lut = [0f32; 256];
    let mut cdf = 0.0;
    for (value, bin) in histogram.iter().enumerate() {
        cdf += bin + share;
        lut[value] = cdf * 255.0 / pixels;
    }
    lut
}

/// Neighbouring tile indices and interpolation weight for one axis.
fn tile_neighbours(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let centre = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    let lower = centre.floor().clamp(0.0, (tiles - 1) as f32);
    let upper = (lower + 1.0).min((tiles - 1) as f32);
    let weight = if upper > lower { (centre - lower).clamp(0.0, 1.0) } else { 0.0 };
    (lower as u32, upper as u32, weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_stroke_on_white_turns_black() {
        let mut gray = GrayImage::from_pixel(40, 40, Luma([250u8]));
        for x in 5..35 {
            gray.put_pixel(x, 20, Luma([10u8]));
        }
        let binary = adaptive_threshold(&gray, 7, 10);
        assert_eq!(binary.get_pixel(20, 20).0[0], 0);
        assert_eq!(binary.get_pixel(20, 5).0[0], 255);
    }

    #[test]
    fn uniform_image_binarizes_white() {
        let binary = adaptive_threshold(&GrayImage::from_pixel(10, 10, Luma([0u8])), 3, 10);
        assert!(binary.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn inversion_only_when_majority_white() {
        let mut mostly_white = GrayImage::from_pixel(4, 4, Luma([255u8]));
        mostly_white.put_pixel(0, 0, Luma([0u8]));
        assert!(invert_if_majority_white(&mut mostly_white));
        assert_eq!(mostly_white.get_pixel(0, 0).0[0], 255);
        assert_eq!(mostly_white.get_pixel(1, 1).0[0], 0);

        let mut mostly_black = GrayImage::from_pixel(4, 4, Luma([0u8]));
        assert!(!invert_if_majority_white(&mut mostly_black));
    }

    #[test]
    fn clahe_stretches_low_contrast_gradient() {
        let gray = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x / 4) as u8]));
        let equalised = clahe(&gray, 2, 2.0);
        let min = equalised.pixels().map(|p| p.0[0]).min().unwrap();
        let max = equalised.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(max - min >= 20, "range {}..{}", min, max);
        assert_eq!(equalised.dimensions(), (64, 64));
    }

    #[test]
    fn clahe_handles_tiny_images() {
        let gray = GrayImage::from_pixel(3, 2, Luma([80u8]));
        assert_eq!(clahe(&gray, 8, 2.0).dimensions(), (3, 2));
    }
}
