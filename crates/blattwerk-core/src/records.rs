// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Derived records: table candidates and extractions, visual artifacts,
// per-page statistics and the consolidated document metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::BBox;
use crate::types::{BlockLang, LangHint, SourceMode, TextBlock, Word, Zone};

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Extraction status of a table region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Ok,
    Fallback,
    Detect,
    Candidate,
    Failed,
    Inadmissible,
}

impl TableStatus {
    /// Base confidence of the status tier.
    pub fn base_confidence(&self) -> f64 {
        match self {
            Self::Ok => 0.85,
            Self::Fallback => 0.6,
            Self::Detect | Self::Candidate => 0.5,
            Self::Failed => 0.2,
            Self::Inadmissible => 0.1,
        }
    }

    /// Statuses that produce a `TableRecord`.
    pub fn is_realized(&self) -> bool {
        matches!(self, Self::Ok | Self::Detect | Self::Fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableCue {
    Rulings,
    Columns,
    Grid,
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableMethod {
    #[serde(rename = "morph")]
    Morph,
    #[serde(rename = "text-alignment")]
    TextAlignment,
}

/// Which capability produced a table's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableTool {
    /// Morphological grid detection.
    Grid,
    /// Recognition-engine output.
    Ocr,
}

/// Structural metrics of a detected grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TableMetrics {
    pub rows: u32,
    pub cols: u32,
    pub cell_count: u32,
    pub avg_cell_height: f64,
    pub avg_cell_width: f64,
    pub avg_cell_area: f64,
}

/// Grid-line positions in bitmap pixels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridGeometry {
    pub row_lines: Vec<u32>,
    pub col_lines: Vec<u32>,
    pub image_width: u32,
    pub image_height: u32,
}

impl GridGeometry {
    pub fn empty(image_width: u32, image_height: u32) -> Self {
        Self {
            row_lines: Vec::new(),
            col_lines: Vec::new(),
            image_width,
            image_height,
        }
    }

    pub fn has_lines(&self) -> bool {
        !self.row_lines.is_empty() || !self.col_lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: u32,
    pub col: u32,
    pub text: String,
    pub bbox: Option<BBox>,
    pub row_span: u32,
    pub col_span: u32,
}

/// Realized extraction of a table candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub page: u32,
    pub status: TableStatus,
    pub tool: TableTool,
    pub bbox: Option<BBox>,
    pub rows: Vec<Vec<String>>,
    pub cells: Vec<TableCell>,
    pub metrics: TableMetrics,
}

/// Detected or hypothesized table region, recorded whether or not
/// extraction succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCandidate {
    pub page: u32,
    pub bbox: Option<BBox>,
    pub confidence: f64,
    pub cues: Vec<TableCue>,
    pub overlaps_text: bool,
    pub method: TableMethod,
    pub gridlines_h: u32,
    pub gridlines_v: u32,
    pub rotation_deg: u32,
    pub status: TableStatus,
    pub tool: TableTool,
    pub decision: String,
    pub rows: u32,
    pub cols: u32,
    pub cell_count: u32,
    pub avg_cell_area: f64,
}

// ---------------------------------------------------------------------------
// Visual artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Signature,
    Stamp,
    Logo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualArtifact {
    pub page: u32,
    /// Bottom-left origin.
    pub bbox: BBox,
    pub kind: ArtifactKind,
    pub confidence: f64,
    pub source: ArtifactSource,
}

// ---------------------------------------------------------------------------
// Per-page statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerPageStat {
    pub page: u32,
    pub width: f64,
    pub height: f64,
    pub source: SourceMode,
    pub decision: String,
    pub lang: Option<BlockLang>,
    /// Character-weighted share per language code. Empty when no block
    /// carries usable text.
    pub lang_share: BTreeMap<String, f64>,
    pub rotation: u32,
    pub skew: f64,
    pub multi_column: bool,
    pub columns_count: u8,
    pub noise: f64,
    pub text_density: f64,
    pub has_header_footer: bool,
    pub images_count: u32,
    pub graphics_count: u32,
    pub has_images: bool,
    pub has_table: bool,
    pub tables_found: u32,
    pub ocr_conf: Option<f64>,
    pub words: u32,
    pub chars: u32,
    pub timing_ms: f64,
    pub flags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Processing log
// ---------------------------------------------------------------------------

/// One processing event recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step: String,
    pub status: String,
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(step: impl Into<String>, status: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            step: step.into(),
            status: status.into(),
            page,
            detail: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.detail.insert(key.into(), value.to_string());
        self
    }

    /// Single-line form: `step status p=N k=v ...`.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.step.clone(), self.status.clone()];
        if let Some(page) = self.page {
            parts.push(format!("p={}", page));
        }
        for (key, value) in &self.detail {
            parts.push(format!("{}={}", key, value));
        }
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Document metadata
// ---------------------------------------------------------------------------

/// Coarse input file family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Image,
    Docx,
    Text,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp" => Self::Image,
            "docx" | "doc" | "odt" => Self::Docx,
            "txt" | "md" => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Unit of the coordinates emitted for this family.
    pub fn coordinate_unit(&self) -> &'static str {
        match self {
            Self::Image => "px",
            _ => "pt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub name: String,
    pub file_type: FileType,
    pub content_hash: Option<String>,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub unit: String,
    pub bbox_origin: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectedLanguages {
    /// Sorted language codes, `["und"]` when nothing was detected.
    pub overall: Vec<String>,
    pub by_page: BTreeMap<u32, Vec<String>>,
    /// `overall` joined with `+`.
    pub doc: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocaleHints {
    pub overall: LangHint,
    pub by_page: BTreeMap<u32, LangHint>,
    pub numbers_locale: LangHint,
    pub dates_locale: LangHint,
}

/// Stage timings in milliseconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timings {
    pub stages: BTreeMap<String, f64>,
    pub total_ms: f64,
}

impl Timings {
    pub const STAGES: [&'static str; 11] = [
        "detect",
        "encoding",
        "readers",
        "text_extract",
        "ocr",
        "table_detect",
        "table_extract",
        "lang_detect",
        "cleaning",
        "merge",
        "summarize",
    ];

    /// Every known stage present, zeroed.
    pub fn zeroed() -> Self {
        Self {
            stages: Self::STAGES.iter().map(|s| (s.to_string(), 0.0)).collect(),
            total_ms: 0.0,
        }
    }

    pub fn add(&mut self, stage: &str, ms: f64) {
        *self.stages.entry(stage.to_string()).or_insert(0.0) += ms;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QaReport {
    pub needs_review: bool,
    /// Pages carrying at least one quality flag.
    pub pages: Vec<u32>,
    pub warnings: usize,
    pub low_conf_pages: Vec<u32>,
    pub low_text_pages: Vec<u32>,
    pub tables_fail: usize,
    pub reasons: Vec<String>,
    pub summary: String,
}

/// Whole-document consolidation. Assembled fully in memory, then serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reader_version: String,
    pub file: FileIdentity,
    pub pages_count: u32,
    pub pages_completed: u32,
    pub cancelled: bool,
    pub coordinate_system: CoordinateSystem,
    pub has_text_layer: bool,
    pub ocr_used: bool,
    pub ocr_langs: String,
    pub avg_ocr_conf: f64,
    pub detected_languages: DetectedLanguages,
    pub locale_hints: LocaleHints,
    pub preprocess_applied: Vec<String>,
    pub timings: Timings,
    pub warnings: Vec<String>,
    pub logs: Vec<String>,
    pub processing_log: Vec<LogEntry>,
    pub per_page: Vec<PerPageStat>,
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<TableRecord>,
    pub table_candidates: Vec<TableCandidate>,
    pub artifacts: Vec<VisualArtifact>,
    pub words: Vec<Word>,
    pub zones: Vec<Zone>,
    pub qa: QaReport,
}
