// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page statistics: source, geometry, language share, quality flags.

use blattwerk_core::config::AnalyzerConfig;
use blattwerk_core::geometry::{PageSize, round_to};
use blattwerk_core::records::PerPageStat;
use blattwerk_core::types::{SourceMode, TextBlock, snap_rotation};

use crate::language::{collapse_share, lang_share};
use crate::layout::zones::header_footer_hits;

pub const LOW_CONF_FLAG: &str = "low_conf_page";
pub const LOW_TEXT_FLAG: &str = "low_text_page";
pub const SUSPICIOUS_TEXT_FLAG: &str = "suspicious_text_page";

/// Thresholds for generated page flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagThresholds {
    pub low_conf: f64,
    pub low_text_min_words: u32,
    pub suspicious_chars_min: u32,
    pub header_footer_margin: f64,
}

impl FlagThresholds {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            low_conf: config.low_conf_threshold,
            low_text_min_words: config.low_text_min_words,
            suspicious_chars_min: config.suspicious_text_chars_min,
            header_footer_margin: config.header_footer_margin,
        }
    }
}

/// Raw per-page signals gathered by a page worker.
#[derive(Debug, Clone, Default)]
pub struct PageSignals {
    pub page: u32,
    pub size: Option<PageSize>,
    pub decision: String,
    pub rotation: f64,
    pub skew: f64,
    pub noise: f64,
    /// Recognition confidence, when recognition ran.
    pub ocr_conf: Option<f64>,
    pub words: u32,
    pub chars: u32,
    pub images_count: u32,
    pub graphics_count: u32,
    pub tables_found: u32,
    pub timing_ms: f64,
    /// Flags supplied upstream, kept first.
    pub flags: Vec<String>,
}

/// Quality flags generated from the signals, appended to the upstream ones
/// without duplicates.
pub fn page_flags(signals: &PageSignals, source: SourceMode, thresholds: &FlagThresholds) -> Vec<String> {
    let mut generated = Vec::new();
    if let Some(conf) = signals.ocr_conf.filter(|_| source.uses_ocr()) {
        if conf < thresholds.low_conf {
            generated.push(LOW_CONF_FLAG);
        } else if signals.words < thresholds.low_text_min_words {
            generated.push(LOW_TEXT_FLAG);
        }
    }
    if source == SourceMode::Text && signals.chars < thresholds.suspicious_chars_min {
        generated.push(SUSPICIOUS_TEXT_FLAG);
    }

    let mut flags: Vec<String> = Vec::new();
    for flag in signals.flags.iter().map(String::as_str).chain(generated) {
        if !flags.iter().any(|f| f == flag) {
            flags.push(flag.to_string());
        }
    }
    flags
}

pub fn text_density(chars: u32, size: Option<&PageSize>) -> f64 {
    match size {
        Some(size) if chars > 0 && size.area() > 0.0 => round_to(chars as f64 / size.area(), 6),
        _ => 0.0,
    }
}

/// Any block in the top or bottom band.
pub fn has_header_footer(blocks: &[TextBlock], page_height: f64, margin: f64) -> bool {
    blocks.iter().any(|block| {
        let (top, bottom) = header_footer_hits(&block.bbox, page_height, margin);
        top || bottom
    })
}

/// Assemble the statistics record of one page from its signals and blocks.
pub fn build_page_stat(signals: &PageSignals, blocks: &[TextBlock], thresholds: &FlagThresholds) -> PerPageStat {
    let source = SourceMode::from_decision(&signals.decision);
    let share = lang_share(blocks);
    let columns_count = if blocks.iter().any(|b| b.column_index == 1) { 2 } else { 1 };
    let (width, height) = signals.size.map_or((0.0, 0.0), |s| (s.width, s.height));

    PerPageStat {
        page: signals.page,
        width,
        height,
        source,
        decision: signals.decision.clone(),
        lang: collapse_share(&share),
        lang_share: share,
        rotation: snap_rotation(signals.rotation),
        skew: round_to(signals.skew, 2),
        multi_column: columns_count > 1,
        columns_count,
        noise: round_to(signals.noise.clamp(0.0, 1.0), 3),
        text_density: text_density(signals.chars, signals.size.as_ref()),
        has_header_footer: height > 0.0 && has_header_footer(blocks, height, thresholds.header_footer_margin),
        images_count: signals.images_count,
        graphics_count: signals.graphics_count,
        has_images: signals.images_count > 0,
        has_table: signals.tables_found > 0,
        tables_found: signals.tables_found,
        ocr_conf: signals.ocr_conf.map(|c| round_to(c, 2)),
        words: signals.words,
        chars: signals.chars,
        timing_ms: round_to(signals.timing_ms, 2),
        flags: page_flags(signals, source, thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::{BlockLang, RawBlock};

    use crate::layout::{LayoutParams, build_blocks};

    fn thresholds() -> FlagThresholds {
        FlagThresholds::from_config(&AnalyzerConfig::default())
    }

    fn signals(decision: &str) -> PageSignals {
        PageSignals {
            page: 1,
            size: Some(PageSize::new(100.0, 200.0).unwrap()),
            decision: decision.to_string(),
            ..PageSignals::default()
        }
    }

    #[test]
    fn low_confidence_recognition_is_flagged() {
        let mut s = signals("ocr");
        s.ocr_conf = Some(40.0);
        s.words = 100;
        assert_eq!(page_flags(&s, SourceMode::Ocr, &thresholds()), vec![LOW_CONF_FLAG.to_string()]);
        s.ocr_conf = Some(90.0);
        s.words = 3;
        assert_eq!(page_flags(&s, SourceMode::Ocr, &thresholds()), vec![LOW_TEXT_FLAG.to_string()]);
    }

    #[test]
    fn thin_text_layer_is_suspicious_and_flags_dedupe() {
        let mut s = signals("native");
        s.chars = 5;
        s.flags = vec!["scanned".into(), SUSPICIOUS_TEXT_FLAG.into()];
        assert_eq!(
            page_flags(&s, SourceMode::Text, &thresholds()),
            vec!["scanned".to_string(), SUSPICIOUS_TEXT_FLAG.to_string()]
        );
    }

    #[test]
    fn stat_rounds_and_snaps() {
        let mut s = signals("native+ocr");
        s.rotation = 93.0;
        s.skew = 1.23456;
        s.noise = 1.7;
        s.chars = 300;
        s.tables_found = 1;
        let stat = build_page_stat(&s, &[], &thresholds());
        assert_eq!(stat.source, SourceMode::Mixed);
        assert_eq!(stat.rotation, 90);
        assert_eq!(stat.skew, 1.23);
        assert_eq!(stat.noise, 1.0);
        assert_eq!(stat.text_density, 0.015);
        assert!(stat.has_table && !stat.has_header_footer);
        assert!(stat.lang_share.is_empty() && stat.lang.is_none());
    }

    #[test]
    fn share_and_bands_from_blocks() {
        let size = PageSize::new(100.0, 200.0).unwrap();
        let raws = vec![
            RawBlock {
                text: "und der die das".into(),
                bbox: vec![10.0, 5.0, 90.0, 15.0],
                ..RawBlock::default()
            },
            RawBlock {
                text: "mixed".into(),
                lang: Some("de+en".into()),
                bbox: vec![10.0, 80.0, 90.0, 100.0],
                ..RawBlock::default()
            },
        ];
        let blocks = build_blocks(1, &size, &raws, SourceMode::Text, &LayoutParams::default()).blocks;
        let stat = build_page_stat(&signals("native"), &blocks, &thresholds());
        assert!(stat.has_header_footer);
        assert_eq!(stat.lang_share.get("de"), Some(&0.875));
        assert_eq!(stat.lang_share.get("en"), Some(&0.125));
        assert_eq!(stat.lang, Some(BlockLang::De));
    }
}
