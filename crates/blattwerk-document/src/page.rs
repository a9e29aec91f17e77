// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page worker: runs every per-page stage for one page and returns its
// results by value.
//
// Stages: native text, mode decision, normalization, recognition, block and
// layout reconstruction, language hints, the table pass, visual artifacts and
// page statistics. A worker never fails: every degraded stage becomes a
// warning code and a fallback value in the returned `PageReport`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use blattwerk_bridge::{
    Capabilities, NativeText, OrientationDetector, Recognition, Recognizer, TimedOrientation,
    TimedRecognizer,
};
use blattwerk_core::config::AnalyzerConfig;
use blattwerk_core::error::BlattwerkError;
use blattwerk_core::geometry::{PageSize, round_to};
use blattwerk_core::records::{
    LogEntry, PerPageStat, TableCandidate, TableRecord, Timings, VisualArtifact,
};
use blattwerk_core::types::{LangHint, RawBlock, RawRegion, RawWord, SourceMode, TextBlock, Word, Zone};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::artifacts::detect_artifacts;
use crate::image::processor::ImageProcessor;
use crate::language::{language_hint, locale_hint, number_and_date_locales};
use crate::layout::{LayoutParams, build_blocks, page_words, page_zones};
use crate::mode::{NativeVolume, decide, merge_text};
use crate::normalize::PageNormalizer;
use crate::stats::{FlagThresholds, PageSignals, build_page_stat};
use crate::tables::{TableExtractor, TablePage};

/// Text recognized for a page upstream, or by the recognizer during the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizedText {
    pub text: String,
    /// Mean confidence 0-100.
    pub conf: Option<f64>,
    pub blocks: Vec<RawBlock>,
    pub words: Vec<RawWord>,
}

impl RecognizedText {
    fn from_recognition(recognition: Recognition) -> Self {
        let conf = recognition.mean_confidence();
        Self {
            blocks: paragraph_blocks(&recognition.text, conf),
            text: recognition.text,
            conf,
            words: Vec::new(),
        }
    }

    /// Blocks to lay out: the supplied ones, or paragraphs of the text.
    fn layout_blocks(&self) -> Vec<RawBlock> {
        if self.blocks.is_empty() {
            paragraph_blocks(&self.text, self.conf)
        } else {
            self.blocks.clone()
        }
    }
}

/// Everything known about one page before analysis.
///
/// Raw bounding boxes are in render space (origin top-left), in the same
/// units as `width`/`height`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInput {
    /// 1-based page number.
    pub page: u32,
    pub width: f64,
    pub height: f64,
    /// Page bitmap on disk, loaded when `bitmap` is absent.
    pub image_path: Option<PathBuf>,
    #[serde(skip)]
    pub bitmap: Option<DynamicImage>,
    /// Native text layer, when the caller already extracted it.
    pub native: Option<NativeText>,
    /// Recognition output, when the caller already ran recognition.
    pub recognized: Option<RecognizedText>,
    pub image_regions: Vec<RawRegion>,
    /// Upstream mode decision; overrides the local decision when present.
    pub decision: Option<String>,
    pub rotation: f64,
    pub noise: f64,
    /// Share of the page covered by images, 0-1.
    pub image_coverage: f64,
    pub images_count: u32,
    pub graphics_count: u32,
    pub dpi_hint: Option<u32>,
    pub flags: Vec<String>,
}

impl PageInput {
    pub fn new(page: u32, width: f64, height: f64) -> Self {
        Self {
            page,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_bitmap(mut self, bitmap: DynamicImage) -> Self {
        self.bitmap = Some(bitmap);
        self
    }

    pub fn with_native(mut self, native: NativeText) -> Self {
        self.native = Some(native);
        self
    }

    pub fn with_recognized(mut self, recognized: RecognizedText) -> Self {
        self.recognized = Some(recognized);
        self
    }
}

/// Results of one page, merged into the document in page order.
#[derive(Debug, Clone)]
pub struct PageReport {
    pub page: u32,
    pub stat: PerPageStat,
    pub blocks: Vec<TextBlock>,
    pub words: Vec<Word>,
    pub zones: Vec<Zone>,
    pub candidates: Vec<TableCandidate>,
    pub tables: Vec<TableRecord>,
    pub artifacts: Vec<VisualArtifact>,
    pub logs: Vec<LogEntry>,
    pub warnings: Vec<String>,
    pub lang_hint: LangHint,
    pub locale_hint: LangHint,
    pub numbers_locale: LangHint,
    pub dates_locale: LangHint,
    pub preprocess_applied: Vec<String>,
    pub has_text_layer: bool,
    pub ocr_used: bool,
    pub timings: Timings,
}

impl PageReport {
    fn empty(page: u32, stat: PerPageStat) -> Self {
        Self {
            page,
            stat,
            blocks: Vec::new(),
            words: Vec::new(),
            zones: Vec::new(),
            candidates: Vec::new(),
            tables: Vec::new(),
            artifacts: Vec::new(),
            logs: Vec::new(),
            warnings: Vec::new(),
            lang_hint: LangHint::Unknown,
            locale_hint: LangHint::Unknown,
            numbers_locale: LangHint::Unknown,
            dates_locale: LangHint::Unknown,
            preprocess_applied: Vec::new(),
            has_text_layer: false,
            ocr_used: false,
            timings: Timings::default(),
        }
    }

    /// Report for a page whose worker could not run to completion.
    pub fn failed(page: u32, detail: &str, thresholds: &FlagThresholds) -> Self {
        let signals = PageSignals {
            page,
            decision: "failed".into(),
            ..PageSignals::default()
        };
        let mut stat = build_page_stat(&signals, &[], thresholds);
        // Content flags say nothing about a page that was never analyzed.
        stat.flags.clear();
        let mut report = Self::empty(page, stat);
        report.warnings.push(format!("page_worker_failed:p{}:{}", page, detail));
        report
            .logs
            .push(LogEntry::new("page", "failed", Some(page)).with("detail", detail));
        report
    }
}

/// Per-run page collaborators, built once and shared by every worker.
pub struct PageContext {
    pub config: AnalyzerConfig,
    pub caps: Capabilities,
    pub normalizer: PageNormalizer,
    pub tables: TableExtractor,
    pub layout: LayoutParams,
    pub flags: FlagThresholds,
}

impl PageContext {
    /// Wrap recognition and orientation in the per-call timeout and build
    /// the page stages from `config`.
    pub fn new(config: AnalyzerConfig, caps: Capabilities) -> Self {
        let timeout = Duration::from_millis(config.recognition_timeout_ms);
        let recognizer: Arc<dyn Recognizer> =
            Arc::new(TimedRecognizer::new(Arc::clone(&caps.recognizer), timeout));
        let orientation: Arc<dyn OrientationDetector> =
            Arc::new(TimedOrientation::new(Arc::clone(&caps.orientation), timeout));
        let caps = caps
            .with_recognizer(Arc::clone(&recognizer))
            .with_orientation(Arc::clone(&orientation));

        Self {
            normalizer: PageNormalizer::from_names(&config.preprocess).with_orientation(orientation),
            tables: TableExtractor::from_config(&config, Arc::clone(&caps.renderer), recognizer),
            layout: LayoutParams::from_config(&config),
            flags: FlagThresholds::from_config(&config),
            config,
            caps,
        }
    }
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("caps", &self.caps)
            .field("normalizer", &self.normalizer)
            .field("layout", &self.layout)
            .finish()
    }
}

// -- Worker -------------------------------------------------------------------

/// Analyze one page.
#[instrument(skip(ctx, input), fields(page = input.page))]
pub fn analyze_page(ctx: &PageContext, input: PageInput) -> PageReport {
    let started = Instant::now();
    let PageInput {
        page,
        width,
        height,
        image_path,
        bitmap,
        native,
        recognized,
        image_regions,
        decision: upstream_decision,
        rotation,
        noise,
        image_coverage,
        images_count,
        graphics_count,
        dpi_hint,
        flags,
    } = input;

    let mut warnings = Vec::new();
    let mut logs = Vec::new();
    let mut timings = Timings::default();

    let bitmap = bitmap.or_else(|| load_bitmap(page, image_path.as_ref(), &mut warnings));
    let size = match PageSize::new(width, height) {
        Ok(size) => size,
        Err(_) => match bitmap.as_ref().map(|b| PageSize::new(b.width() as f64, b.height() as f64)) {
            Some(Ok(size)) => size,
            _ => {
                warn!(page, width, height, "Page has no usable size");
                let mut report = PageReport::failed(page, "page size missing", &ctx.flags);
                report.warnings.insert(0, format!("config:p{}:page size missing", page));
                return report;
            }
        },
    };

    // -- Native text and mode -------------------------------------------------
    let clock = Instant::now();
    let native = native.or_else(|| fetch_native(ctx, page));
    let native_text = native.as_ref().map(native_text_of).unwrap_or_default();
    let volume = NativeVolume {
        blocks: native.as_ref().map_or(0, |n| n.blocks.len()),
        words: native.as_ref().map_or(0, |n| n.word_count().max(native_text.split_whitespace().count())),
        chars: native_text.chars().count(),
    };
    timings.add("text_extract", elapsed_ms(clock));

    let (decision, use_native, run_recognition) = match upstream_decision.filter(|d| !d.trim().is_empty()) {
        Some(decision) => {
            let source = SourceMode::from_decision(&decision);
            (decision, source != SourceMode::Ocr, source.uses_ocr())
        }
        None => {
            let mode = decide(ctx.config.mode, volume, image_coverage, ctx.config.blocks_threshold);
            (mode.decision.to_string(), mode.use_native, mode.run_recognition)
        }
    };
    debug!(page, decision = %decision, native_chars = volume.chars, "Page mode decided");

    // -- Normalization and recognition ----------------------------------------
    let clock = Instant::now();
    let normalized = bitmap.map(|image| ctx.normalizer.normalize(image, page));
    let mut skew = 0.0;
    let mut applied_rotation = 0;
    if let Some(n) = &normalized {
        warnings.extend(n.warnings.iter().cloned());
        skew = f64::from(n.skew);
        applied_rotation = n.orientation;
        if n.orientation != 0 || n.skew != 0.0 {
            logs.push(
                LogEntry::new("deskew", "applied", Some(page))
                    .with("rotation", n.orientation)
                    .with("skew", round_to(skew, 2)),
            );
        }
    }
    let image = normalized.as_ref().map(|n| &n.image);

    let recognized = if run_recognition {
        recognized.or_else(|| recognize_page(ctx, page, image, &mut warnings, &mut logs))
    } else {
        None
    };
    timings.add("ocr", elapsed_ms(clock));

    // -- Merge ---------------------------------------------------------------
    let clock = Instant::now();
    let native_used = use_native && !native_text.trim().is_empty();
    let (final_text, raw_blocks, raw_words, block_source) = match (native_used, &recognized) {
        (true, Some(rec)) => {
            let (text, _) = merge_text(
                &native_text,
                volume.confidence(),
                &rec.text,
                rec.conf.unwrap_or(0.0),
            );
            if text == rec.text && text != native_text {
                (text, rec.layout_blocks(), rec.words.clone(), SourceMode::Ocr)
            } else {
                let n = native.as_ref().map(native_layout).unwrap_or_default();
                (text, n.0, n.1, SourceMode::Text)
            }
        }
        (true, None) => {
            let n = native.as_ref().map(native_layout).unwrap_or_default();
            (native_text.clone(), n.0, n.1, SourceMode::Text)
        }
        (false, Some(rec)) => (rec.text.clone(), rec.layout_blocks(), rec.words.clone(), SourceMode::Ocr),
        (false, None) => (String::new(), Vec::new(), Vec::new(), SourceMode::Text),
    };

    let page_blocks = build_blocks(page, &size, &raw_blocks, block_source, &ctx.layout);
    warnings.extend(page_blocks.warnings);
    let blocks = page_blocks.blocks;
    let words = page_words(page, &size, &raw_words, &raw_blocks);
    let zones = page_zones(page, &size, &blocks, ctx.flags.header_footer_margin);
    timings.add("merge", elapsed_ms(clock));

    // -- Language ------------------------------------------------------------
    let clock = Instant::now();
    let lang_hint = language_hint(&final_text);
    let page_locale = locale_hint(&final_text);
    let (numbers_locale, dates_locale) = number_and_date_locales(&final_text);
    timings.add("lang_detect", elapsed_ms(clock));

    // -- Tables and artifacts ------------------------------------------------
    let fallback_text = Some(final_text.as_str()).filter(|t| !t.trim().is_empty());
    let table_pass = ctx.tables.process_page(&TablePage {
        page,
        size,
        decision: &decision,
        dpi_hint,
        bitmap: image,
        blocks: &blocks,
        fallback_text,
        rotation: applied_rotation,
    });
    timings.add("table_detect", table_pass.detect_ms);
    timings.add("table_extract", table_pass.extract_ms);
    warnings.extend(table_pass.warnings);
    logs.extend(table_pass.logs);

    let found = detect_artifacts(page, &size, &image_regions);
    warnings.extend(found.warnings);
    logs.extend(found.logs);

    // -- Statistics ----------------------------------------------------------
    let clock = Instant::now();
    let candidates: Vec<TableCandidate> = table_pass.candidate.into_iter().collect();
    let tables: Vec<TableRecord> = table_pass.table.into_iter().collect();
    let signals = PageSignals {
        page,
        size: Some(size),
        decision: decision.clone(),
        rotation: rotation + f64::from(applied_rotation),
        skew,
        noise,
        ocr_conf: recognized.as_ref().and_then(|r| r.conf),
        words: final_text.split_whitespace().count() as u32,
        chars: final_text.chars().count() as u32,
        images_count,
        graphics_count,
        tables_found: tables.len() as u32,
        timing_ms: elapsed_ms(started),
        flags,
    };
    let stat = build_page_stat(&signals, &blocks, &ctx.flags);
    timings.add("summarize", elapsed_ms(clock));

    info!(
        page,
        decision = %stat.decision,
        blocks = blocks.len(),
        tables = tables.len(),
        artifacts = found.artifacts.len(),
        warnings = warnings.len(),
        "Page analyzed"
    );

    PageReport {
        page,
        stat,
        blocks,
        words,
        zones,
        candidates,
        tables,
        artifacts: found.artifacts,
        logs,
        warnings,
        lang_hint,
        locale_hint: page_locale,
        numbers_locale,
        dates_locale,
        preprocess_applied: normalized
            .map(|n| n.applied.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default(),
        has_text_layer: native.as_ref().is_some_and(|n| !n.is_empty()),
        ocr_used: recognized.is_some(),
        timings,
    }
}

// -- Stage helpers ------------------------------------------------------------

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

fn load_bitmap(page: u32, path: Option<&PathBuf>, warnings: &mut Vec<String>) -> Option<DynamicImage> {
    let path = path?;
    match ImageProcessor::open(path) {
        Ok(processor) => Some(processor.into_dynamic()),
        Err(err) => {
            warn!(page, error = %err, "Page bitmap unreadable");
            warnings.push(format!("page_missing_image:p{}", page));
            None
        }
    }
}

fn fetch_native(ctx: &PageContext, page: u32) -> Option<NativeText> {
    if !ctx.caps.native_text.is_available() {
        return None;
    }
    match ctx.caps.native_text.extract_native_text(page) {
        Ok(native) => native,
        Err(err) => {
            warn!(page, error = %err, "Native text extraction failed; treating page as image-only");
            None
        }
    }
}

fn recognize_page(
    ctx: &PageContext,
    page: u32,
    image: Option<&DynamicImage>,
    warnings: &mut Vec<String>,
    logs: &mut Vec<LogEntry>,
) -> Option<RecognizedText> {
    let recognizer = &ctx.caps.recognizer;
    if !recognizer.is_available() {
        debug!(page, "No recognizer; page keeps its native text");
        return None;
    }
    let Some(image) = image else {
        warn!(page, "Recognition wanted but the page has no image");
        warnings.push(format!("page_missing_image:p{}", page));
        return None;
    };

    match recognizer.recognize(image, &ctx.config.ocr_langs) {
        Ok(recognition) => {
            let text = RecognizedText::from_recognition(recognition);
            logs.push(
                LogEntry::new("ocr", "ok", Some(page))
                    .with("engine", recognizer.name())
                    .with("words", text.text.split_whitespace().count()),
            );
            Some(text)
        }
        Err(BlattwerkError::Timeout(ms)) => {
            warn!(page, timeout_ms = ms, "Recognition timed out");
            warnings.push(format!("recognition_timeout:p{}", page));
            logs.push(LogEntry::new("ocr", "timeout", Some(page)).with("timeout_ms", ms));
            None
        }
        Err(err) => {
            warn!(page, error = %err, "Recognition failed");
            warnings.push(format!("recognition_failed:p{}:{}", page, err));
            logs.push(LogEntry::new("ocr", "failed", Some(page)).with("kind", err.kind()));
            None
        }
    }
}

/// Native text, or the block texts joined when the layer carries no flat text.
fn native_text_of(native: &NativeText) -> String {
    if !native.text.trim().is_empty() {
        return native.text.clone();
    }
    native
        .blocks
        .iter()
        .map(|b| b.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn native_layout(native: &NativeText) -> (Vec<RawBlock>, Vec<RawWord>) {
    let blocks = if native.blocks.is_empty() {
        paragraph_blocks(&native.text, None)
    } else {
        native.blocks.clone()
    };
    (blocks, native.words.clone())
}

/// One box-less block per blank-line separated paragraph.
fn paragraph_blocks(text: &str, conf: Option<f64>) -> Vec<RawBlock> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| RawBlock {
            text: p.to_string(),
            ocr_conf: conf,
            ..RawBlock::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_bridge::{RecognizedToken, unavailable_capabilities};
    use blattwerk_core::config::TablesMode;
    use blattwerk_core::error::Result;
    use blattwerk_core::records::TableStatus;
    use blattwerk_core::types::BlockType;
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    struct FixedEngine(&'static str, f32);

    struct FixedTurn(u32);

    impl OrientationDetector for FixedTurn {
        fn detect_orientation(&self, _image: &DynamicImage) -> Result<u32> {
            Ok(self.0)
        }
    }

    impl Recognizer for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
            Ok(Recognition {
                text: self.0.to_string(),
                tokens: self
                    .0
                    .split_whitespace()
                    .map(|t| RecognizedToken {
                        text: t.to_string(),
                        confidence: Some(self.1),
                    })
                    .collect(),
            })
        }
    }

    struct FailingEngine;

    impl Recognizer for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
            Err(BlattwerkError::Recognition("engine crashed".into()))
        }
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            preprocess: Vec::new(),
            tables_mode: TablesMode::Off,
            ..AnalyzerConfig::default()
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255u8])))
    }

    fn native_page() -> NativeText {
        NativeText {
            text: String::new(),
            words: Vec::new(),
            blocks: vec![
                RawBlock {
                    text: "Rechnung und Lieferschein fuer die Firma".into(),
                    bbox: vec![50.0, 100.0, 500.0, 140.0],
                    ..RawBlock::default()
                },
                RawBlock {
                    text: "Seite 1".into(),
                    bbox: vec![50.0, 960.0, 200.0, 990.0],
                    ..RawBlock::default()
                },
            ],
        }
    }

    #[test]
    fn native_page_keeps_native_text() {
        let ctx = PageContext::new(
            AnalyzerConfig {
                mode: blattwerk_core::config::ModeHint::Text,
                ..config()
            },
            unavailable_capabilities(),
        );
        let report = analyze_page(&ctx, PageInput::new(1, 600.0, 1000.0).with_native(native_page()));
        assert_eq!(report.stat.decision, "native");
        assert_eq!(report.stat.source, SourceMode::Text);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[1].block_type, BlockType::Footer);
        assert_eq!(report.lang_hint, LangHint::De);
        assert!(report.has_text_layer);
        assert!(!report.ocr_used);
    }

    #[test]
    fn image_page_is_recognized() {
        let caps = unavailable_capabilities()
            .with_recognizer(Arc::new(FixedEngine("Thank you for your invoice", 91.0)));
        let ctx = PageContext::new(config(), caps);
        let report = analyze_page(&ctx, PageInput::new(2, 100.0, 100.0).with_bitmap(blank(100, 100)));
        assert_eq!(report.stat.decision, "ocr");
        assert_eq!(report.stat.ocr_conf, Some(91.0));
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].source, SourceMode::Ocr);
        assert_eq!(report.lang_hint, LangHint::En);
        assert!(report.ocr_used);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn recognition_failure_degrades_to_empty_text() {
        let caps = unavailable_capabilities().with_recognizer(Arc::new(FailingEngine));
        let ctx = PageContext::new(config(), caps);
        let report = analyze_page(&ctx, PageInput::new(3, 100.0, 100.0).with_bitmap(blank(100, 100)));
        assert!(report.blocks.is_empty());
        assert_eq!(
            report.warnings,
            vec!["recognition_failed:p3:recognition failed: engine crashed".to_string()]
        );
        assert!(!report.ocr_used);
    }

    #[test]
    fn missing_image_is_a_warning() {
        let caps = unavailable_capabilities().with_recognizer(Arc::new(FixedEngine("x", 90.0)));
        let ctx = PageContext::new(config(), caps);
        let report = analyze_page(&ctx, PageInput::new(4, 100.0, 100.0));
        assert_eq!(report.warnings, vec!["page_missing_image:p4".to_string()]);
        assert_eq!(report.stat.decision, "ocr");
    }

    #[test]
    fn upstream_recognition_is_reused() {
        let ctx = PageContext::new(config(), unavailable_capabilities());
        let input = PageInput::new(5, 100.0, 100.0).with_recognized(RecognizedText {
            text: "Bitte zahlen Sie den Betrag".into(),
            conf: Some(60.0),
            ..RecognizedText::default()
        });
        let report = analyze_page(&ctx, input);
        assert_eq!(report.stat.ocr_conf, Some(60.0));
        assert!(report.stat.flags.contains(&"low_conf_page".to_string()));
    }

    #[test]
    fn page_size_falls_back_to_bitmap() {
        let ctx = PageContext::new(config(), unavailable_capabilities());
        let report = analyze_page(&ctx, PageInput::new(6, 0.0, 0.0).with_bitmap(blank(80, 40)));
        assert_eq!((report.stat.width, report.stat.height), (80.0, 40.0));
    }

    #[test]
    fn missing_size_fails_page() {
        let ctx = PageContext::new(config(), unavailable_capabilities());
        let report = analyze_page(&ctx, PageInput::new(7, 0.0, 0.0));
        assert_eq!(report.warnings[0], "config:p7:page size missing");
        assert_eq!(report.warnings[1], "page_worker_failed:p7:page size missing");
        assert!(report.blocks.is_empty());
    }

    #[test]
    fn ruled_page_yields_candidate() {
        let mut gray = GrayImage::from_pixel(400, 300, Luma([255u8]));
        for y in [50, 250] {
            draw_filled_rect_mut(&mut gray, Rect::at(50, y).of_size(301, 2), Luma([0u8]));
        }
        for x in [50, 200, 350] {
            draw_filled_rect_mut(&mut gray, Rect::at(x, 50).of_size(2, 201), Luma([0u8]));
        }
        let ctx = PageContext::new(
            AnalyzerConfig {
                tables_mode: TablesMode::Detect,
                ..config()
            },
            unavailable_capabilities(),
        );
        let report = analyze_page(
            &ctx,
            PageInput::new(1, 400.0, 300.0).with_bitmap(DynamicImage::ImageLuma8(gray)),
        );
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].status, TableStatus::Detect);
        assert_eq!(report.stat.tables_found, 1);
    }

    #[test]
    fn quarter_turned_scan_keeps_table_in_upright_frame() {
        let mut upright = GrayImage::from_pixel(800, 600, Luma([255u8]));
        for y in [100, 500] {
            draw_filled_rect_mut(&mut upright, Rect::at(100, y).of_size(601, 2), Luma([0u8]));
        }
        for x in [100, 400, 700] {
            draw_filled_rect_mut(&mut upright, Rect::at(x, 100).of_size(2, 401), Luma([0u8]));
        }
        // Stored a quarter turn counter-clockwise; the detector asks for 90.
        let scanned = DynamicImage::ImageLuma8(upright).rotate270();
        let ctx = PageContext::new(
            AnalyzerConfig {
                preprocess: vec!["deskew".into()],
                tables_mode: TablesMode::Detect,
                ..config()
            },
            unavailable_capabilities().with_orientation(Arc::new(FixedTurn(90))),
        );
        let report = analyze_page(&ctx, PageInput::new(1, 300.0, 400.0).with_bitmap(scanned));

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].status, TableStatus::Detect);
        let bbox = report.candidates[0].bbox.unwrap();
        for (got, want) in bbox.to_array().iter().zip([50.0, 50.0, 350.0, 250.0]) {
            assert!((got - want).abs() <= 1.0, "{:?}", bbox);
        }
    }

    #[test]
    fn failed_report_carries_warning() {
        let report = PageReport::failed(9, "panicked", &FlagThresholds::from_config(&config()));
        assert_eq!(report.warnings, vec!["page_worker_failed:p9:panicked".to_string()]);
        assert_eq!(report.stat.page, 9);
        assert!(report.stat.flags.is_empty());
    }
}
