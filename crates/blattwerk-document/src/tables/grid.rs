// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ruled-table grid detection on a single page bitmap.
//
// 1. Adaptive binarization, inverted so strokes are foreground.
// 2. Directional morphological opening keeps only long horizontal and long
//    vertical strokes (the "line maps").
// 3. Each line map is projected onto its perpendicular axis; peaks above 10%
//    of the strongest projection become grid lines after 1-D clustering.
// 4. Consecutive grid lines bound the cells.

use blattwerk_bridge::Recognizer;
use blattwerk_core::config::Sensitivity;
use blattwerk_core::records::{GridGeometry, TableMetrics};
use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;
use crate::image::threshold::{adaptive_threshold, invert_if_majority_white};

const BINARIZE_BLOCK_RADIUS: u32 = 15;
const BINARIZE_OFFSET: i32 = 10;
/// Smallest line kernel in pixels.
const MIN_KERNEL: u32 = 10;
/// Projection floor: a coordinate needs more than this many line pixels.
const MIN_PROJECTION: u32 = 5;
/// Adjacent peak coordinates closer than this merge into one line.
const PEAK_GAP: u32 = 3;
/// Lines closer than this after clustering are duplicates.
const DEDUPE_TOLERANCE: u32 = 2;
/// Inward crop padding for cell recognition.
const CELL_PAD: u32 = 1;

/// Horizontal and vertical line maps of a page.
#[derive(Debug, Clone)]
pub struct LineMaps {
    pub horizontal: GrayImage,
    pub vertical: GrayImage,
}

impl LineMaps {
    pub fn is_empty(&self) -> bool {
        !self.horizontal.pixels().any(|p| p.0[0] > 0) && !self.vertical.pixels().any(|p| p.0[0] > 0)
    }
}

/// Output of one grid scan.
#[derive(Debug, Clone)]
pub struct GridScan {
    /// Cell text per row. Empty when no usable grid was found.
    pub rows: Vec<Vec<String>>,
    pub metrics: TableMetrics,
    pub geometry: GridGeometry,
    /// True when either line map carried any pixels.
    pub has_line_pixels: bool,
}

/// Binarize for stroke detection: strokes non-zero, background zero.
pub fn binarize_strokes(gray: &GrayImage) -> GrayImage {
    let mut binary = adaptive_threshold(gray, BINARIZE_BLOCK_RADIUS, BINARIZE_OFFSET);
    invert_if_majority_white(&mut binary);
    binary
}

/// Kernel lengths `(horizontal, vertical)` for a bitmap of the given size.
pub fn kernel_sizes(width: u32, height: u32, sensitivity: Sensitivity) -> (u32, u32) {
    let divisor = sensitivity.kernel_divisor();
    ((width / divisor).max(MIN_KERNEL), (height / divisor).max(MIN_KERNEL))
}

/// Morphological opening with `1 x k` and `k x 1` line kernels.
///
/// Opening a binary image with a line kernel keeps exactly the foreground
/// runs at least `k` long in that direction, which is computed directly from
/// run lengths.
pub fn line_maps(binary: &GrayImage, sensitivity: Sensitivity) -> LineMaps {
    let (width, height) = binary.dimensions();
    let (h_kernel, v_kernel) = kernel_sizes(width, height, sensitivity);
    let mut horizontal = GrayImage::new(width, height);
    let mut vertical = GrayImage::new(width, height);

    for y in 0..height {
        let mut run_start = 0;
        for x in 0..=width {
            let on = x < width && binary.get_pixel(x, y).0[0] > 0;
            if !on {
                if x - run_start >= h_kernel {
                    for rx in run_start..x {
                        horizontal.put_pixel(rx, y, Luma([255]));
                    }
                }
                run_start = x + 1;
            }
        }
    }

    for x in 0..width {
        let mut run_start = 0;
        for y in 0..=height {
            let on = y < height && binary.get_pixel(x, y).0[0] > 0;
            if !on {
                if y - run_start >= v_kernel {
                    for ry in run_start..y {
                        vertical.put_pixel(x, ry, Luma([255]));
                    }
                }
                run_start = y + 1;
            }
        }
    }

    LineMaps { horizontal, vertical }
}

/// Row-wise (`horizontal == true`) or column-wise count of line pixels.
pub fn projection(map: &GrayImage, horizontal: bool) -> Vec<u32> {
    let (width, height) = map.dimensions();
    if horizontal {
        (0..height)
            .map(|y| (0..width).filter(|&x| map.get_pixel(x, y).0[0] > 0).count() as u32)
            .collect()
    } else {
        (0..width)
            .map(|x| (0..height).filter(|&y| map.get_pixel(x, y).0[0] > 0).count() as u32)
            .collect()
    }
}

/// Grid-line coordinates from a projection profile.
///
/// Coordinates whose count exceeds `max(5, 10% of the peak)` are grouped
/// when no more than `min_gap` apart; each group yields its mean coordinate.
pub fn project_peaks(profile: &[u32], min_gap: u32) -> Vec<u32> {
    let Some(&max) = profile.iter().max() else {
        return Vec::new();
    };
    if max == 0 {
        return Vec::new();
    }
    let threshold = MIN_PROJECTION.max(max / 10);
    let hits: Vec<u32> = profile
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > threshold)
        .map(|(idx, _)| idx as u32)
        .collect();

    let mut lines = Vec::new();
    let mut group: Vec<u32> = Vec::new();
    for idx in hits {
        if let Some(&last) = group.last() {
            if idx - last > min_gap {
                lines.push(group_mean(&group));
                group.clear();
            }
        }
        group.push(idx);
    }
    if !group.is_empty() {
        lines.push(group_mean(&group));
    }
    lines
}

fn group_mean(group: &[u32]) -> u32 {
    let sum: u64 = group.iter().map(|&v| v as u64).sum();
    (sum / group.len() as u64) as u32
}

/// Drop lines within `tolerance` of the previously kept one.
pub fn dedupe_lines(lines: &[u32], tolerance: u32) -> Vec<u32> {
    let mut sorted = lines.to_vec();
    sorted.sort_unstable();
    let mut kept: Vec<u32> = Vec::with_capacity(sorted.len());
    for line in sorted {
        match kept.last() {
            Some(&last) if line - last <= tolerance => {}
            _ => kept.push(line),
        }
    }
    kept
}

/// Structural metrics from grid lines. Fewer than two lines on either axis
/// means no usable grid: counts still report the gaps, cells are zero.
pub fn grid_metrics(row_lines: &[u32], col_lines: &[u32]) -> TableMetrics {
    let rows = row_lines.len().saturating_sub(1) as u32;
    let cols = col_lines.len().saturating_sub(1) as u32;
    if row_lines.len() < 2 || col_lines.len() < 2 {
        return TableMetrics {
            rows,
            cols,
            ..TableMetrics::default()
        };
    }
    let span = |lines: &[u32]| (lines[lines.len() - 1] - lines[0]) as f64;
    let avg_cell_height = span(row_lines) / rows as f64;
    let avg_cell_width = span(col_lines) / cols as f64;
    TableMetrics {
        rows,
        cols,
        cell_count: rows * cols,
        avg_cell_height,
        avg_cell_width,
        avg_cell_area: avg_cell_height * avg_cell_width,
    }
}

/// Scan a page bitmap for a ruled grid and optionally recognize cell text.
///
/// `recognizer` is consulted only when `ocr_cells` is set; any recognition
/// failure leaves that cell empty.
#[instrument(skip(image, recognizer), fields(width = image.width(), height = image.height()))]
pub fn scan_grid(
    image: &DynamicImage,
    sensitivity: Sensitivity,
    ocr_cells: bool,
    recognizer: Option<&dyn Recognizer>,
    lang_hint: &str,
) -> GridScan {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    let binary = binarize_strokes(&gray);
    let maps = line_maps(&binary, sensitivity);

    if maps.is_empty() {
        debug!("No line pixels on either axis");
        return GridScan {
            rows: Vec::new(),
            metrics: TableMetrics::default(),
            geometry: GridGeometry::empty(width, height),
            has_line_pixels: false,
        };
    }

    let row_lines = dedupe_lines(&project_peaks(&projection(&maps.horizontal, true), PEAK_GAP), DEDUPE_TOLERANCE);
    let col_lines = dedupe_lines(&project_peaks(&projection(&maps.vertical, false), PEAK_GAP), DEDUPE_TOLERANCE);
    let metrics = grid_metrics(&row_lines, &col_lines);

    if row_lines.len() < 2 || col_lines.len() < 2 {
        debug!(row_lines = row_lines.len(), col_lines = col_lines.len(), "No usable grid");
        return GridScan {
            rows: Vec::new(),
            metrics,
            geometry: GridGeometry::empty(width, height),
            has_line_pixels: true,
        };
    }

    let recognizer = if ocr_cells { recognizer } else { None };
    let rows = row_lines
        .windows(2)
        .map(|ys| {
            col_lines
                .windows(2)
                .map(|xs| match recognizer {
                    Some(engine) => recognize_cell(image, engine, lang_hint, xs[0], ys[0], xs[1], ys[1]),
                    None => String::new(),
                })
                .collect()
        })
        .collect();

    debug!(rows = metrics.rows, cols = metrics.cols, cells = metrics.cell_count, "Grid detected");
    GridScan {
        rows,
        metrics,
        geometry: GridGeometry {
            row_lines,
            col_lines,
            image_width: width,
            image_height: height,
        },
        has_line_pixels: true,
    }
}

fn recognize_cell(
    image: &DynamicImage,
    engine: &dyn Recognizer,
    lang_hint: &str,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
) -> String {
    let (left, top) = (x0 + CELL_PAD, y0 + CELL_PAD);
    let (right, bottom) = (x1.saturating_sub(CELL_PAD), y1.saturating_sub(CELL_PAD));
    if right <= left || bottom <= top {
        return String::new();
    }
    let cell = ImageProcessor::from_dynamic(image.clone())
        .crop(left, top, right - left, bottom - top)
        .into_dynamic();
    match engine.recognize(&cell, lang_hint) {
        Ok(result) => result.text.trim().to_string(),
        Err(err) => {
            debug!(error = %err, "Cell recognition failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_bridge::{Recognition, RecognizedToken};
    use blattwerk_core::error::Result;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    /// White page with two horizontal and three vertical 2px rules.
    fn ruled_page() -> DynamicImage {
        let mut gray = GrayImage::from_pixel(400, 300, Luma([255u8]));
        for y in [50, 250] {
            draw_filled_rect_mut(&mut gray, Rect::at(50, y).of_size(302, 2), Luma([0u8]));
        }
        for x in [50, 200, 350] {
            draw_filled_rect_mut(&mut gray, Rect::at(x, 50).of_size(2, 202), Luma([0u8]));
        }
        DynamicImage::ImageLuma8(gray)
    }

    struct EchoEngine;

    impl Recognizer for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
            let text = format!("{}x{}", image.width(), image.height());
            Ok(Recognition {
                tokens: vec![RecognizedToken { text: text.clone(), confidence: Some(80.0) }],
                text,
            })
        }
    }

    #[test]
    fn peaks_cluster_adjacent_rows() {
        let mut profile = vec![0u32; 40];
        profile[10] = 100;
        profile[11] = 100;
        profile[12] = 90;
        profile[30] = 50;
        assert_eq!(project_peaks(&profile, 3), vec![11, 30]);
    }

    #[test]
    fn weak_projection_is_ignored() {
        let mut profile = vec![0u32; 20];
        profile[3] = 4;
        profile[9] = 5;
        assert!(project_peaks(&profile, 3).is_empty());
        assert!(project_peaks(&[], 3).is_empty());
    }

    #[test]
    fn dedupe_collapses_close_lines() {
        assert_eq!(dedupe_lines(&[10, 12, 40, 41, 80], 2), vec![10, 40, 80]);
    }

    #[test]
    fn single_row_single_col_is_rejected() {
        let metrics = grid_metrics(&[10], &[5, 50]);
        assert_eq!((metrics.rows, metrics.cols, metrics.cell_count), (0, 1, 0));
        let metrics = grid_metrics(&[10, 60], &[5]);
        assert_eq!(metrics.cell_count, 0);
        assert_eq!(metrics.avg_cell_area, 0.0);
    }

    #[test]
    fn kernels_scale_with_sensitivity() {
        assert_eq!(kernel_sizes(1600, 2400, Sensitivity::Normal), (20, 30));
        assert_eq!(kernel_sizes(1600, 2400, Sensitivity::High), (32, 48));
        assert_eq!(kernel_sizes(200, 200, Sensitivity::Normal), (10, 10));
    }

    #[test]
    fn opening_keeps_only_long_runs() {
        let mut binary = GrayImage::new(60, 30);
        for x in 5..50 {
            binary.put_pixel(x, 10, Luma([255]));
        }
        for x in 5..12 {
            binary.put_pixel(x, 20, Luma([255]));
        }
        let maps = line_maps(&binary, Sensitivity::Normal);
        assert_eq!(maps.horizontal.get_pixel(20, 10).0[0], 255);
        assert_eq!(maps.horizontal.get_pixel(6, 20).0[0], 0);
        assert!(!maps.vertical.pixels().any(|p| p.0[0] > 0));
    }

    #[test]
    fn ruled_page_yields_one_row_two_cols() {
        let scan = scan_grid(&ruled_page(), Sensitivity::Normal, false, None, "deu+eng");
        assert_eq!(scan.geometry.row_lines, vec![50, 250]);
        assert_eq!(scan.geometry.col_lines, vec![50, 200, 350]);
        assert_eq!((scan.metrics.rows, scan.metrics.cols, scan.metrics.cell_count), (1, 2, 2));
        assert_eq!(scan.metrics.avg_cell_height, 200.0);
        assert_eq!(scan.metrics.avg_cell_width, 150.0);
        assert_eq!(scan.rows, vec![vec![String::new(), String::new()]]);
    }

    #[test]
    fn blank_page_has_no_lines() {
        let black = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 80, Luma([0u8])));
        let scan = scan_grid(&black, Sensitivity::High, true, Some(&EchoEngine), "deu");
        assert!(!scan.has_line_pixels);
        assert!(scan.rows.is_empty());
        assert_eq!((scan.metrics.rows, scan.metrics.cols, scan.metrics.cell_count), (0, 0, 0));
        assert!(scan.geometry.row_lines.is_empty() && scan.geometry.col_lines.is_empty());
        assert_eq!((scan.geometry.image_width, scan.geometry.image_height), (120, 80));
    }

    #[test]
    fn cell_recognition_runs_on_padded_crops() {
        let scan = scan_grid(&ruled_page(), Sensitivity::Normal, true, Some(&EchoEngine), "deu");
        assert_eq!(scan.rows, vec![vec!["148x198".to_string(), "148x198".to_string()]]);
    }
}
