// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stand-in for collaborators that are not installed.
//
// Every capability reports itself unavailable and returns
// `EngineUnavailable` if called anyway.

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;

use crate::traits::*;

/// No-op collaborator used when an engine is absent.
pub struct Unavailable;

impl Recognizer for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn recognize(&self, _image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
        tracing::warn!("Recognizer::recognize called on unavailable engine");
        Err(BlattwerkError::EngineUnavailable("recognizer".into()))
    }
}

impl OrientationDetector for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn detect_orientation(&self, _image: &DynamicImage) -> Result<u32> {
        tracing::warn!("OrientationDetector::detect_orientation called on unavailable engine");
        Err(BlattwerkError::EngineUnavailable("orientation".into()))
    }
}

impl NativeTextSource for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn extract_native_text(&self, _page: u32) -> Result<Option<NativeText>> {
        Err(BlattwerkError::EngineUnavailable("native text".into()))
    }
}

impl PageRenderer for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn render(&self, _page: u32, _zoom: f64) -> Result<DynamicImage> {
        tracing::warn!("PageRenderer::render called on unavailable engine");
        Err(BlattwerkError::EngineUnavailable("renderer".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_capability_reports_unavailable() {
        assert!(!Recognizer::is_available(&Unavailable));
        assert!(!OrientationDetector::is_available(&Unavailable));
        assert!(!NativeTextSource::is_available(&Unavailable));
        assert!(!PageRenderer::is_available(&Unavailable));
    }

    #[test]
    fn calls_return_engine_unavailable() {
        let image = DynamicImage::new_luma8(4, 4);
        assert!(matches!(
            Unavailable.recognize(&image, "deu"),
            Err(BlattwerkError::EngineUnavailable(_))
        ));
        assert!(matches!(
            Unavailable.detect_orientation(&image),
            Err(BlattwerkError::EngineUnavailable(_))
        ));
        assert!(Unavailable.extract_native_text(1).is_err());
        assert!(Unavailable.render(1, 2.0).is_err());
    }

    struct BlankRenderer;

    impl PageRenderer for BlankRenderer {
        fn render(&self, _page: u32, zoom: f64) -> Result<DynamicImage> {
            let side = (100.0 * zoom) as u32;
            Ok(DynamicImage::new_luma8(side, side))
        }
    }

    #[test]
    fn builder_swaps_one_capability() {
        let caps = crate::unavailable_capabilities().with_renderer(std::sync::Arc::new(BlankRenderer));
        assert!(caps.renderer.is_available());
        assert!(!caps.recognizer.is_available());
        assert_eq!(caps.renderer.render(1, 2.0).unwrap().width(), 200);
    }
}
