// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: the structural analysis engine.
//
// Normalizes page bitmaps (orientation, skew, filters), finds ruled table
// grids, classifies visual artifacts, reconstructs text blocks with layout
// and language hints, rolls everything up into per-page statistics and
// consolidates a document record. Pages run in parallel; see `analyzer`.

pub mod analyzer;
pub mod artifacts;
pub mod export;
pub mod image;
pub mod language;
pub mod layout;
pub mod meta;
pub mod mode;
pub mod normalize;
pub mod page;
pub mod pdf;
pub mod stats;
pub mod tables;

#[cfg(feature = "ocr")]
pub mod ocr;

// Re-export the primary entry points so callers can use `blattwerk_document::DocumentAnalyzer` etc.
pub use analyzer::{DocumentAnalyzer, DocumentInput};
pub use export::export_run;
pub use image::processor::ImageProcessor;
pub use normalize::PageNormalizer;
pub use page::{PageInput, PageReport, RecognizedText, analyze_page};
pub use pdf::PdfTextSource;
pub use tables::TableExtractor;

#[cfg(feature = "ocr")]
pub use ocr::{OcrModels, OcrsRecognizer};
