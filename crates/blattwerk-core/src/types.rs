// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: page modes, languages, text blocks and their raw inputs.

use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Native text layer.
    Text,
    /// Optical recognition.
    Ocr,
    /// Both sources contributed.
    Mixed,
}

impl SourceMode {
    /// Collapse a free-form decision string into the closed set.
    ///
    /// Substring match: `ocr` together with `native` (or an explicit `mixed`)
    /// is `Mixed`, `ocr` alone is `Ocr`, everything else is `Text`.
    pub fn from_decision(decision: &str) -> Self {
        let lowered = decision.trim().to_ascii_lowercase();
        let has_ocr = lowered.contains("ocr");
        if (has_ocr && lowered.contains("native")) || lowered.contains("mixed") {
            Self::Mixed
        } else if has_ocr {
            Self::Ocr
        } else {
            Self::Text
        }
    }

    pub fn uses_ocr(&self) -> bool {
        matches!(self, Self::Ocr | Self::Mixed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ocr => "ocr",
            Self::Mixed => "mixed",
        }
    }
}

/// Languages the analyzer resolves blocks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    De,
    En,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
        }
    }
}

/// Resolved language of a block or page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockLang {
    #[serde(rename = "de")]
    De,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "de+en")]
    DeEn,
}

impl BlockLang {
    /// Individual languages covered by this label.
    pub fn langs(&self) -> &'static [Lang] {
        match self {
            Self::De => &[Lang::De],
            Self::En => &[Lang::En],
            Self::DeEn => &[Lang::De, Lang::En],
        }
    }

    pub fn from_langs(has_de: bool, has_en: bool) -> Option<Self> {
        match (has_de, has_en) {
            (true, true) => Some(Self::DeEn),
            (true, false) => Some(Self::De),
            (false, true) => Some(Self::En),
            (false, false) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
            Self::DeEn => "de+en",
        }
    }
}

/// Three-state hint used for document-level language and locale merging.
///
/// `merge` is a join on the lattice `Unknown < {De, En} < Mixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangHint {
    #[default]
    Unknown,
    De,
    En,
    Mixed,
}

impl LangHint {
    pub fn merge(self, other: LangHint) -> LangHint {
        match (self, other) {
            (Self::Unknown, x) | (x, Self::Unknown) => x,
            (a, b) if a == b => a,
            _ => Self::Mixed,
        }
    }

    /// Lenient parse of upstream labels (`de`, `deu`, `eng`, `mixed`, ...).
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "de" | "deu" | "ger" | "german" => Self::De,
            "en" | "eng" | "english" => Self::En,
            "mixed" | "de+en" | "en+de" | "deu+eng" => Self::Mixed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::De => "de",
            Self::En => "en",
            Self::Mixed => "mixed",
        }
    }
}

impl From<BlockLang> for LangHint {
    fn from(lang: BlockLang) -> Self {
        match lang {
            BlockLang::De => Self::De,
            BlockLang::En => Self::En,
            BlockLang::DeEn => Self::Mixed,
        }
    }
}

/// Three-way paragraph style derived from the heading and list flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphStyle {
    Heading,
    List,
    Body,
}

impl ParagraphStyle {
    pub fn from_flags(is_heading: bool, is_list: bool) -> Self {
        if is_heading {
            Self::Heading
        } else if is_list {
            Self::List
        } else {
            Self::Body
        }
    }
}

/// Classified role of a block on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Header,
    Footer,
    Heading,
    ListItem,
    Paragraph,
}

/// Schema-conformant text block in document space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: String,
    pub page: u32,
    pub text: String,
    pub lines: Vec<String>,
    /// Bottom-left origin.
    pub bbox: BBox,
    pub reading_order_index: usize,
    pub lang: BlockLang,
    pub lang_conf: f64,
    pub is_heading: bool,
    pub is_list: bool,
    pub is_bold: bool,
    pub is_upper: bool,
    pub paragraph_style: ParagraphStyle,
    pub list_level: u32,
    pub line_height: f64,
    pub baseline: f64,
    pub column_index: u8,
    pub indent_level: u32,
    pub numbering_marker: Option<String>,
    pub block_type: BlockType,
    pub font_size: Option<f64>,
    pub ocr_conf_avg: Option<f64>,
    pub token_count: usize,
    pub char_count: usize,
    pub source: SourceMode,
}

/// Word in document space, linked to its block by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub page: u32,
    pub text: String,
    pub bbox: BBox,
    pub conf: Option<f64>,
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Header,
    Body,
    Footer,
}

/// Coarse vertical page region, bottom-left origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub page: u32,
    pub kind: ZoneKind,
    pub bbox: BBox,
}

// ---------------------------------------------------------------------------
// Raw upstream records (render space, loosely populated)
// ---------------------------------------------------------------------------

/// Block record as delivered by native extraction or recognition output.
///
/// Coordinates are top-left origin. Everything except `text` and `bbox` is
/// optional; missing style flags are derived from the text and fonts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBlock {
    pub id: Option<String>,
    pub text: String,
    pub bbox: Vec<f64>,
    pub lang: Option<String>,
    pub lang_hint: Option<String>,
    pub is_heading: Option<bool>,
    pub is_list: Option<bool>,
    pub is_bold: Option<bool>,
    pub list_level: Option<u32>,
    pub reading_order_index: Option<usize>,
    pub font_size: Option<f64>,
    pub font_name: Option<String>,
    pub font_flags: Option<u32>,
    pub ocr_conf: Option<f64>,
}

/// Word record, top-left origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawWord {
    pub text: String,
    pub bbox: Vec<f64>,
    pub conf: Option<f64>,
    /// Index into the page's raw block list.
    pub block: Option<usize>,
}

/// Non-text region reported by the renderer (embedded image, drawing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRegion {
    pub bbox: Vec<f64>,
}

/// Snap an arbitrary rotation to the nearest multiple of 90, modulo 360.
pub fn snap_rotation(degrees: f64) -> u32 {
    if !degrees.is_finite() {
        return 0;
    }
    let normalized = degrees.rem_euclid(360.0);
    let snapped = (normalized / 90.0).round() as u32 * 90;
    snapped % 360
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_strings_collapse() {
        assert_eq!(SourceMode::from_decision("native+ocr"), SourceMode::Mixed);
        assert_eq!(SourceMode::from_decision("OCR"), SourceMode::Ocr);
        assert_eq!(SourceMode::from_decision("tesseract_ocr"), SourceMode::Ocr);
        assert_eq!(SourceMode::from_decision("native"), SourceMode::Text);
        assert_eq!(SourceMode::from_decision("text"), SourceMode::Text);
        assert_eq!(SourceMode::from_decision(""), SourceMode::Text);
        assert_eq!(SourceMode::from_decision("mixed"), SourceMode::Mixed);
    }

    #[test]
    fn merge_lattice() {
        use LangHint::*;
        assert_eq!(Unknown.merge(De), De);
        assert_eq!(De.merge(Unknown), De);
        assert_eq!(De.merge(En), Mixed);
        assert_eq!(De.merge(De), De);
        assert_eq!(Unknown.merge(Unknown), Unknown);
        assert_eq!(Mixed.merge(De), Mixed);
    }

    #[test]
    fn rotation_snaps_to_quadrants() {
        assert_eq!(snap_rotation(0.0), 0);
        assert_eq!(snap_rotation(44.0), 0);
        assert_eq!(snap_rotation(46.0), 90);
        assert_eq!(snap_rotation(-90.0), 270);
        assert_eq!(snap_rotation(359.0), 0);
        assert_eq!(snap_rotation(540.0), 180);
        assert_eq!(snap_rotation(f64::NAN), 0);
    }

    #[test]
    fn block_lang_serialises_with_plus() {
        assert_eq!(serde_json::to_string(&BlockLang::DeEn).unwrap(), "\"de+en\"");
        assert_eq!(serde_json::to_string(&BlockType::ListItem).unwrap(), "\"list_item\"");
    }

    #[test]
    fn paragraph_style_prefers_heading() {
        assert_eq!(ParagraphStyle::from_flags(true, true), ParagraphStyle::Heading);
        assert_eq!(ParagraphStyle::from_flags(false, true), ParagraphStyle::List);
        assert_eq!(ParagraphStyle::from_flags(false, false), ParagraphStyle::Body);
    }
}
