// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Residual skew estimation from straight line segments.
//
// Hough lines only resolve whole degrees, so each detected line is refined
// into a segment by a least-squares fit over the edge pixels lying on it.
// The angle statistics then run over the refined segments.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use tracing::debug;

/// Largest correction ever applied, in degrees.
pub const MAX_SKEW_DEG: f32 = 15.0;
/// Estimates below this magnitude are treated as straight.
pub const MIN_SKEW_DEG: f32 = 0.5;
/// Segments further than this from horizontal are ignored.
const HORIZONTAL_WINDOW_DEG: f32 = 45.0;
/// Edge pixels within this distance of a Hough line belong to it.
const LINE_TOLERANCE_PX: f32 = 1.5;

/// A straight segment in image coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Segment {
    /// Angle against the x axis in degrees, `None` for vertical segments.
    pub fn angle_degrees(&self) -> Option<f32> {
        let dx = self.x1 - self.x0;
        if dx == 0.0 {
            return None;
        }
        Some((self.y1 - self.y0).atan2(dx).to_degrees())
    }

    pub fn length(&self) -> f32 {
        ((self.x1 - self.x0).powi(2) + (self.y1 - self.y0).powi(2)).sqrt()
    }
}

/// Detect straight segments: blur, Canny, Hough, least-squares refinement.
pub fn detect_segments(gray: &GrayImage) -> Vec<Segment> {
    let (width, height) = gray.dimensions();
    if width < 8 || height < 8 {
        return Vec::new();
    }
    let blurred = gaussian_blur_f32(gray, 1.0);
    let edges = canny(&blurred, 50.0, 150.0);

    let points: Vec<(f32, f32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| (x as f32, y as f32))
        .collect();
    if points.is_empty() {
        return Vec::new();
    }

    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: 100,
            suppression_radius: 8,
        },
    );
    let min_length = (width as f32 / 10.0).max(20.0);

    let segments: Vec<Segment> = lines
        .iter()
        .filter_map(|line| refine_line(line, &points, min_length))
        .collect();
    debug!(
        hough_lines = lines.len(),
        segments = segments.len(),
        edge_pixels = points.len(),
        "Skew segments detected"
    );
    segments
}

/// Fit a segment to the edge pixels supporting a Hough line.
fn refine_line(line: &PolarLine, points: &[(f32, f32)], min_length: f32) -> Option<Segment> {
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin, cos) = theta.sin_cos();
    let support: Vec<(f32, f32)> = points
        .iter()
        .copied()
        .filter(|(x, y)| (x * cos + y * sin - line.r).abs() <= LINE_TOLERANCE_PX)
        .collect();
    if (support.len() as f32) < min_length {
        return None;
    }

    let n = support.len() as f32;
    let mean_x = support.iter().map(|p| p.0).sum::<f32>() / n;
    let mean_y = support.iter().map(|p| p.1).sum::<f32>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in &support {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let direction = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (dir_y, dir_x) = direction.sin_cos();

    let (mut t_min, mut t_max) = (f32::INFINITY, f32::NEG_INFINITY);
    for (x, y) in &support {
        let t = (x - mean_x) * dir_x + (y - mean_y) * dir_y;
        t_min = t_min.min(t);
        t_max = t_max.max(t);
    }
    if t_max - t_min < min_length {
        return None;
    }
    Some(Segment {
        x0: mean_x + t_min * dir_x,
        y0: mean_y + t_min * dir_y,
        x1: mean_x + t_max * dir_x,
        y1: mean_y + t_max * dir_y,
    })
}

/// Robust skew estimate from segment angles, in degrees.
///
/// Angles are wrapped into [-90, 90], restricted to within 45 of horizontal,
/// filtered to the 1.5 x IQR fences and reduced to their median. The result
/// is clamped to +/-15 and snapped to 0 below 0.5.
pub fn estimate_skew(angles: &[f32]) -> f32 {
    let mut kept: Vec<f32> = angles
        .iter()
        .filter(|a| a.is_finite())
        .map(|a| wrap_angle(*a))
        .filter(|a| a.abs() <= HORIZONTAL_WINDOW_DEG)
        .collect();
    if kept.is_empty() {
        return 0.0;
    }
    kept.sort_by(f32::total_cmp);

    let q1 = percentile(&kept, 0.25);
    let q3 = percentile(&kept, 0.75);
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let inliers: Vec<f32> = kept.iter().copied().filter(|a| *a >= low && *a <= high).collect();
    let sample = if inliers.is_empty() { &kept } else { &inliers };

    let angle = percentile(sample, 0.5).clamp(-MAX_SKEW_DEG, MAX_SKEW_DEG);
    if angle.abs() < MIN_SKEW_DEG { 0.0 } else { angle }
}

/// Skew of a page bitmap, 0 when no usable segments exist.
pub fn estimate_page_skew(gray: &GrayImage) -> f32 {
    let angles: Vec<f32> = detect_segments(gray)
        .iter()
        .filter_map(Segment::angle_degrees)
        .collect();
    estimate_skew(&angles)
}

fn wrap_angle(mut angle: f32) -> f32 {
    while angle > 90.0 {
        angle -= 180.0;
    }
    while angle < -90.0 {
        angle += 180.0;
    }
    angle
}

/// Linear-interpolated percentile of a sorted, non-empty slice.
fn percentile(sorted: &[f32], q: f32) -> f32 {
    let pos = q * (sorted.len() - 1) as f32;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f32;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_line_segment_mut;

    #[test]
    fn uniform_inliers_win_over_outliers() {
        for theta in [-14.0f32, -3.25, 0.75, 2.0, 9.5, 15.0] {
            for outliers in 0..5 {
                let mut angles = vec![theta; 6];
                angles.extend((0..outliers).map(|i| 30.0 - i as f32 * 17.0));
                let estimate = estimate_skew(&angles);
                assert!((estimate - theta).abs() < 1e-4, "theta {} outliers {} -> {}", theta, outliers, estimate);
            }
        }
    }

    #[test]
    fn small_and_large_angles_follow_policy() {
        assert_eq!(estimate_skew(&[0.3, 0.2, 0.4]), 0.0);
        assert_eq!(estimate_skew(&[20.0, 21.0, 22.0]), 15.0);
        assert_eq!(estimate_skew(&[-30.0, -31.0]), -15.0);
        assert_eq!(estimate_skew(&[]), 0.0);
    }

    #[test]
    fn near_vertical_and_wrapped_angles() {
        // 178 wraps to -2; 80 is outside the horizontal window.
        assert!((estimate_skew(&[178.0, 178.0, 80.0]) + 2.0).abs() < 1e-4);
        assert_eq!(estimate_skew(&[80.0, -70.0]), 0.0);
        let vertical = Segment { x0: 5.0, y0: 0.0, x1: 5.0, y1: 50.0 };
        assert_eq!(vertical.angle_degrees(), None);
    }

    #[test]
    fn blank_page_has_no_skew() {
        let gray = GrayImage::from_pixel(200, 150, Luma([255u8]));
        assert!(detect_segments(&gray).is_empty());
        assert_eq!(estimate_page_skew(&gray), 0.0);
    }

    #[test]
    fn tilted_rules_are_measured() {
        let mut gray = GrayImage::from_pixel(400, 300, Luma([255u8]));
        let slope = 3.0f32.to_radians().tan();
        for base in [60.0f32, 120.0, 180.0] {
            for offset in 0..3 {
                let y = base + offset as f32;
                draw_line_segment_mut(&mut gray, (20.0, y), (380.0, y + 360.0 * slope), Luma([0u8]));
            }
        }
        let skew = estimate_page_skew(&gray);
        assert!((skew - 3.0).abs() < 0.75, "estimated {}", skew);
    }
}
