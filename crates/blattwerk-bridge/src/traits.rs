// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for the external collaborators the analyzer consumes.
//
// The analyzer never recognizes, renders or parses PDFs itself. Each
// collaborator is injected behind one of these traits; an absent
// collaborator is the `Unavailable` implementation, never an `Option`.

use std::sync::Arc;

use blattwerk_core::error::Result;
use blattwerk_core::types::{RawBlock, RawWord};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A recognized token with its engine confidence (0-100), when the engine
/// reports one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedToken {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Output of one recognition call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    pub tokens: Vec<RecognizedToken>,
}

impl Recognition {
    /// Mean confidence over tokens that carry one.
    pub fn mean_confidence(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .tokens
            .iter()
            .filter_map(|t| t.confidence)
            .map(f64::from)
            .collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Optical text recognition over an image region.
///
/// Treated as slow and unreliable: callers bound every call with a timeout
/// and degrade any error to empty text.
pub trait Recognizer: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Whether calls can succeed at all. Checked once per run.
    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, image: &DynamicImage, lang_hint: &str) -> Result<Recognition>;
}

/// Coarse page orientation detection.
pub trait OrientationDetector: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Clockwise rotation (0/90/180/270) needed to make the page upright.
    fn detect_orientation(&self, image: &DynamicImage) -> Result<u32>;
}

/// Text, words and blocks from a page's native text layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeText {
    pub text: String,
    pub words: Vec<RawWord>,
    pub blocks: Vec<RawBlock>,
}

impl NativeText {
    pub fn word_count(&self) -> usize {
        if self.words.is_empty() {
            self.text.split_whitespace().count()
        } else {
            self.words.len()
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.blocks.iter().all(|b| b.text.trim().is_empty())
    }
}

/// Native text-layer extraction (PDF, DOCX).
pub trait NativeTextSource: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// `Ok(None)` when the page has no text layer.
    fn extract_native_text(&self, page: u32) -> Result<Option<NativeText>>;
}

/// Page rasterisation at a requested zoom (1.0 = 72 dpi).
pub trait PageRenderer: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn render(&self, page: u32, zoom: f64) -> Result<DynamicImage>;
}

/// The full set of collaborators handed to an analyzer.
#[derive(Clone)]
pub struct Capabilities {
    pub recognizer: Arc<dyn Recognizer>,
    pub orientation: Arc<dyn OrientationDetector>,
    pub native_text: Arc<dyn NativeTextSource>,
    pub renderer: Arc<dyn PageRenderer>,
}

impl Capabilities {
    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn with_orientation(mut self, orientation: Arc<dyn OrientationDetector>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_native_text(mut self, native_text: Arc<dyn NativeTextSource>) -> Self {
        self.native_text = native_text;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("recognizer", &self.recognizer.name())
            .field("orientation", &self.orientation.is_available())
            .field("native_text", &self.native_text.is_available())
            .field("renderer", &self.renderer.is_available())
            .finish()
    }
}
