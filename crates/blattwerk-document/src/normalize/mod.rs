// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalization: an ordered filter chain applied to a page bitmap
// before recognition and table detection.
//
// Steps: `deskew` (coarse orientation, then residual skew), `clahe`,
// `unsharp`, `denoise`, `grayscale`, `adaptive`. Unknown step names are
// skipped so configuration written for newer builds still runs.

pub mod skew;

use std::sync::Arc;

use blattwerk_bridge::OrientationDetector;
use blattwerk_core::error::BlattwerkError;
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::image::threshold::{adaptive_threshold, clahe};

/// CLAHE tile grid (per axis).
const CLAHE_TILES: u32 = 8;
const CLAHE_CLIP_LIMIT: f32 = 2.0;
const UNSHARP_SIGMA: f32 = 1.0;
/// Adaptive threshold window 35x35.
const ADAPTIVE_BLOCK_RADIUS: u32 = 17;
const ADAPTIVE_OFFSET: i32 = 10;

/// One named normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeStep {
    Deskew,
    Clahe,
    Unsharp,
    Denoise,
    Grayscale,
    Adaptive,
}

impl NormalizeStep {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "deskew" => Some(Self::Deskew),
            "clahe" => Some(Self::Clahe),
            "unsharp" => Some(Self::Unsharp),
            "denoise" => Some(Self::Denoise),
            "grayscale" | "gray" => Some(Self::Grayscale),
            "adaptive" => Some(Self::Adaptive),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Deskew => "deskew",
            Self::Clahe => "clahe",
            Self::Unsharp => "unsharp",
            Self::Denoise => "denoise",
            Self::Grayscale => "grayscale",
            Self::Adaptive => "adaptive",
        }
    }
}

/// Result of normalizing one page.
#[derive(Debug, Clone)]
pub struct NormalizedPage {
    pub image: DynamicImage,
    /// Steps that ran, in order.
    pub applied: Vec<&'static str>,
    /// Clockwise quarter-turn correction applied (0/90/180/270).
    pub orientation: u32,
    /// Residual skew corrected, degrees (image coordinates).
    pub skew: f32,
    pub warnings: Vec<String>,
}

/// Ordered, reusable chain of normalization steps.
#[derive(Clone)]
pub struct PageNormalizer {
    steps: Vec<NormalizeStep>,
    orientation: Option<Arc<dyn OrientationDetector>>,
}

impl PageNormalizer {
    // -- Construction ---------------------------------------------------------

    pub fn new(steps: Vec<NormalizeStep>) -> Self {
        Self {
            steps,
            orientation: None,
        }
    }

    /// Build from configured step names, dropping names it does not know.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let steps = names
            .iter()
            .filter_map(|name| {
                let step = NormalizeStep::parse(name.as_ref());
                if step.is_none() {
                    debug!(step = name.as_ref(), "Ignoring unknown normalization step");
                }
                step
            })
            .collect();
        Self::new(steps)
    }

    /// Use `detector` for coarse orientation. Absent detectors are skipped
    /// here, once, instead of at every page.
    pub fn with_orientation(mut self, detector: Arc<dyn OrientationDetector>) -> Self {
        self.orientation = detector.is_available().then_some(detector);
        self
    }

    pub fn steps(&self) -> &[NormalizeStep] {
        &self.steps
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run every step in order over `image`.
    #[instrument(skip(self, image), fields(page, steps = self.steps.len()))]
    pub fn normalize(&self, image: DynamicImage, page: u32) -> NormalizedPage {
        let mut result = NormalizedPage {
            image,
            applied: Vec::with_capacity(self.steps.len()),
            orientation: 0,
            skew: 0.0,
            warnings: Vec::new(),
        };

        for step in &self.steps {
            let current = std::mem::replace(&mut result.image, DynamicImage::new_luma8(1, 1));
            result.image = match step {
                NormalizeStep::Deskew => self.deskew(current, page, &mut result),
                NormalizeStep::Clahe => DynamicImage::ImageLuma8(clahe(
                    &current.to_luma8(),
                    CLAHE_TILES,
                    CLAHE_CLIP_LIMIT,
                )),
                NormalizeStep::Unsharp => ImageProcessor::from_dynamic(current)
                    .unsharp(UNSHARP_SIGMA)
                    .into_dynamic(),
                NormalizeStep::Denoise => ImageProcessor::from_dynamic(current).denoise().into_dynamic(),
                NormalizeStep::Grayscale => ImageProcessor::from_dynamic(current).grayscale().into_dynamic(),
                NormalizeStep::Adaptive => DynamicImage::ImageLuma8(adaptive_threshold(
                    &current.to_luma8(),
                    ADAPTIVE_BLOCK_RADIUS,
                    ADAPTIVE_OFFSET,
                )),
            };
            result.applied.push(step.name());
        }

        info!(
            page,
            applied = ?result.applied,
            orientation = result.orientation,
            skew = result.skew,
            "Page normalized"
        );
        result
    }

    /// Coarse orientation first, then residual skew on the upright page.
    fn deskew(&self, image: DynamicImage, page: u32, result: &mut NormalizedPage) -> DynamicImage {
        let mut processor = ImageProcessor::from_dynamic(image);

        if let Some(detector) = &self.orientation {
            match detector.detect_orientation(processor.as_dynamic()) {
                Ok(rotation @ (90 | 180 | 270)) => {
                    processor = processor.rotate(rotation as f32);
                    result.orientation = rotation;
                    debug!(page, rotation, "Orientation corrected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(page, error = %err, "Orientation detection failed; leaving page as is");
                    if !matches!(err, BlattwerkError::EngineUnavailable(_)) {
                        result.warnings.push(format!("orientation_unavailable:p{}", page));
                    }
                }
            }
        }

        let angle = skew::estimate_page_skew(&processor.as_dynamic().to_luma8());
        if angle != 0.0 {
            // Positive angles tilt down to the right; undo counter-clockwise.
            processor = processor.rotate(-angle);
            result.skew = angle;
            debug!(page, angle, "Skew corrected");
        }
        processor.into_dynamic()
    }
}

impl std::fmt::Debug for PageNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageNormalizer")
            .field("steps", &self.steps)
            .field("orientation", &self.orientation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::error::Result;
    use image::{GrayImage, Luma};

    struct FixedOrientation(Result<u32>);

    impl OrientationDetector for FixedOrientation {
        fn detect_orientation(&self, _image: &DynamicImage) -> Result<u32> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(_) => Err(BlattwerkError::Recognition("osd failed".into())),
            }
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255u8])))
    }

    #[test]
    fn unknown_steps_are_ignored() {
        let normalizer = PageNormalizer::from_names(&["deskew", "sharpen-more", "Grayscale"]);
        assert_eq!(normalizer.steps(), &[NormalizeStep::Deskew, NormalizeStep::Grayscale]);
    }

    #[test]
    fn quarter_turn_orientation_is_undone() {
        let normalizer = PageNormalizer::from_names(&["deskew"])
            .with_orientation(Arc::new(FixedOrientation(Ok(90))));
        let page = normalizer.normalize(blank(60, 40), 1);
        assert_eq!(page.orientation, 90);
        assert_eq!((page.image.width(), page.image.height()), (40, 60));
        assert_eq!(page.applied, vec!["deskew"]);
    }

    #[test]
    fn odd_orientation_results_are_rejected() {
        let normalizer = PageNormalizer::from_names(&["deskew"])
            .with_orientation(Arc::new(FixedOrientation(Ok(45))));
        let page = normalizer.normalize(blank(60, 40), 1);
        assert_eq!(page.orientation, 0);
        assert_eq!((page.image.width(), page.image.height()), (60, 40));
    }

    #[test]
    fn orientation_failure_is_not_fatal() {
        let normalizer = PageNormalizer::from_names(&["deskew"])
            .with_orientation(Arc::new(FixedOrientation(Err(BlattwerkError::Cancelled))));
        let page = normalizer.normalize(blank(30, 30), 4);
        assert_eq!(page.orientation, 0);
        assert_eq!(page.warnings, vec!["orientation_unavailable:p4".to_string()]);
    }

    #[test]
    fn chain_runs_in_order_and_is_idempotent_on_clean_pages() {
        let normalizer =
            PageNormalizer::from_names(&["deskew", "denoise", "grayscale", "adaptive"]);
        let first = normalizer.normalize(blank(50, 50), 1);
        assert_eq!(first.applied, vec!["deskew", "denoise", "grayscale", "adaptive"]);
        let second = normalizer.normalize(first.image.clone(), 1);
        assert_eq!(first.image.to_luma8(), second.image.to_luma8());
    }
}
