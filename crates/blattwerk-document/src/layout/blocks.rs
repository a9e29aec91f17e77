// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text block reconstruction: raw block records (render space, top-left
// origin) become `TextBlock`s in document space with layout metadata.

use blattwerk_core::config::AnalyzerConfig;
use blattwerk_core::geometry::{BBox, PageSize, round_to};
use blattwerk_core::types::{BlockType, ParagraphStyle, RawBlock, SourceMode, TextBlock};
use tracing::{debug, warn};

use super::style;
use crate::language::{lang_confidence, resolve_block_lang};

/// Left offset ignored before indentation counts.
const INDENT_ORIGIN: f64 = 10.0;
const MIN_INDENT_UNIT: f64 = 12.0;

/// Geometry thresholds for block classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Share of page height treated as header/footer band for block types.
    pub block_margin: f64,
    pub column_right: f64,
    pub column_left: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            block_margin: 0.10,
            column_right: 0.85,
            column_left: 0.15,
        }
    }
}

impl LayoutParams {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            block_margin: config.block_header_margin,
            column_right: config.column_right_threshold,
            column_left: config.column_left_threshold,
        }
    }

    /// Column index from the horizontal centre: 1 past the right threshold,
    /// else 0.
    pub fn column_index(&self, bbox: &BBox, page_width: f64) -> u8 {
        let (cx, _) = bbox.center();
        let normalized = (cx / page_width).clamp(0.0, 1.0);
        if normalized >= self.column_right {
            1
        } else {
            // Left of `column_left` and the middle band both read as column 0.
            0
        }
    }

    /// Header/footer from margins, otherwise from style flags. `bbox` is in
    /// document space.
    pub fn block_type(&self, bbox: Option<&BBox>, page_height: f64, is_heading: bool, is_list: bool) -> BlockType {
        if let Some(bbox) = bbox {
            let band = page_height * self.block_margin;
            if bbox.y1 >= page_height - band {
                return BlockType::Header;
            }
            if bbox.y0 <= band {
                return BlockType::Footer;
            }
        }
        if is_heading {
            BlockType::Heading
        } else if is_list {
            BlockType::ListItem
        } else {
            BlockType::Paragraph
        }
    }
}

pub fn indent_level(x0: f64, page_width: f64) -> u32 {
    let unit = (page_width * 0.04).max(MIN_INDENT_UNIT);
    ((x0 - INDENT_ORIGIN) / unit).max(0.0).floor() as u32
}

/// Stable block id for a raw record.
pub fn block_id(page: u32, index: usize, raw: &RawBlock) -> String {
    raw.id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("p{}-b{:03}", page, index))
}

fn text_lines(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() && !text.trim().is_empty() {
        vec![text.trim().to_string()]
    } else {
        lines
    }
}

/// Blocks of one page plus warnings for degraded records.
#[derive(Debug, Clone, Default)]
pub struct PageBlocks {
    pub blocks: Vec<TextBlock>,
    pub warnings: Vec<String>,
}

/// Reconstruct the blocks of one page, ordered by reading order.
///
/// A block without a box (recognized text carries none) or with an unusable
/// one keeps its text, takes the page box and skips geometric layout.
/// Only unusable boxes warn.
pub fn build_blocks(
    page: u32,
    size: &PageSize,
    raw_blocks: &[RawBlock],
    source: SourceMode,
    params: &LayoutParams,
) -> PageBlocks {
    let mut out = PageBlocks::default();
    let sizes: Vec<f64> = raw_blocks.iter().filter_map(|b| b.font_size).filter(|s| *s > 0.0).collect();
    let mean_font = (!sizes.is_empty()).then(|| sizes.iter().sum::<f64>() / sizes.len() as f64);

    for (index, raw) in raw_blocks.iter().enumerate() {
        let text = raw.text.trim_end().to_string();
        let lines = text_lines(&text);
        let geometry = match BBox::from_slice(&raw.bbox) {
            Ok(bbox) => Some(bbox.flip_vertical(size.height)),
            Err(_) if raw.bbox.is_empty() => None,
            Err(err) => {
                warn!(page, index, error = %err, "Block has no usable bbox");
                out.warnings.push(format!("invalid_bbox:p{}:block{}", page, index));
                None
            }
        };
        let bbox = geometry.unwrap_or_else(|| size.bbox());

        let is_heading = raw
            .is_heading
            .unwrap_or_else(|| style::heading_like(&text, lines.len(), raw.font_size, mean_font));
        let is_list = raw.is_list.unwrap_or_else(|| style::list_like(&text));
        let is_bold = raw
            .is_bold
            .unwrap_or_else(|| style::is_bold(raw.font_name.as_deref(), raw.font_flags));
        let lang = resolve_block_lang(raw.lang.as_deref(), raw.lang_hint.as_deref(), &text);

        let (line_height, baseline, column_index, indent) = match geometry {
            Some(b) => (
                round_to(b.height(), 2),
                round_to(b.y0, 2),
                params.column_index(&b, size.width),
                indent_level(b.x0, size.width),
            ),
            None => (0.0, 0.0, 0, 0),
        };

        out.blocks.push(TextBlock {
            id: block_id(page, index, raw),
            page,
            lines,
            bbox: bbox.rounded(3),
            reading_order_index: raw.reading_order_index.unwrap_or(index),
            lang,
            lang_conf: lang_confidence(lang, &text),
            is_heading,
            is_list,
            is_bold,
            is_upper: style::is_upper(&text),
            paragraph_style: ParagraphStyle::from_flags(is_heading, is_list),
            list_level: raw.list_level.unwrap_or(u32::from(is_list)),
            line_height,
            baseline,
            column_index,
            indent_level: indent,
            numbering_marker: style::numbering_marker(&text),
            block_type: params.block_type(geometry.as_ref(), size.height, is_heading, is_list),
            font_size: raw.font_size.map(|s| round_to(s, 2)),
            ocr_conf_avg: raw.ocr_conf.map(|c| round_to(c, 2)),
            token_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
            source,
            text,
        });
    }

    out.blocks.sort_by_key(|block| block.reading_order_index);
    debug!(page, blocks = out.blocks.len(), "Blocks reconstructed");
    out
}
