// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analyzer configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Upstream hint for which recognition mode to attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeHint {
    Text,
    Ocr,
    Mixed,
    Auto,
}

/// How much table work a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TablesMode {
    Off,
    /// Geometry only; cell text is blanked.
    #[serde(alias = "detect-only", alias = "check", alias = "flag", alias = "light")]
    Detect,
    /// Extraction with cell recognition at high sensitivity.
    Full,
}

impl TablesMode {
    pub fn is_detect_only(&self) -> bool {
        matches!(self, Self::Detect)
    }

    pub fn sensitivity(&self) -> Sensitivity {
        match self {
            Self::Full => Sensitivity::High,
            _ => Sensitivity::Normal,
        }
    }
}

/// Line-detection sensitivity. `High` uses finer morphology kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Normal,
    High,
}

impl Sensitivity {
    /// Divisor applied to image extent to size the line kernels.
    pub fn kernel_divisor(&self) -> u32 {
        match self {
            Self::Normal => 80,
            Self::High => 50,
        }
    }
}

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    // -- Run --
    pub mode: ModeHint,
    /// Recognition language hint, engine syntax (`deu+eng`).
    pub ocr_langs: String,
    pub dpi: u32,
    /// Concurrent page workers.
    pub workers: usize,
    pub recognition_timeout_ms: u64,
    /// Ordered normalization steps. Unknown names are ignored.
    pub preprocess: Vec<String>,

    // -- Tables --
    pub tables_mode: TablesMode,
    pub tables_ocr_cells: bool,
    pub tables_min_words: usize,
    pub table_detect_min_area: f64,
    pub table_detect_max_cells: u32,
    pub table_detect_dpi_floor: u32,
    pub table_extract_dpi_floor: u32,
    pub allow_borderless: bool,
    pub export_dir: Option<PathBuf>,

    // -- Page decisions and quality flags --
    pub blocks_threshold: usize,
    pub low_conf_threshold: f64,
    pub low_text_min_words: u32,
    pub suspicious_text_chars_min: u32,

    // -- Layout ratios --
    pub header_footer_margin: f64,
    pub block_header_margin: f64,
    pub column_right_threshold: f64,
    pub column_left_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: ModeHint::Mixed,
            ocr_langs: "deu+eng".into(),
            dpi: 300,
            workers: 4,
            recognition_timeout_ms: 30_000,
            preprocess: vec!["deskew".into()],
            tables_mode: TablesMode::Detect,
            tables_ocr_cells: true,
            tables_min_words: 12,
            table_detect_min_area: 9000.0,
            table_detect_max_cells: 600,
            table_detect_dpi_floor: 220,
            table_extract_dpi_floor: 300,
            allow_borderless: false,
            export_dir: None,
            blocks_threshold: 3,
            low_conf_threshold: 75.0,
            low_text_min_words: 12,
            suspicious_text_chars_min: 40,
            header_footer_margin: 0.12,
            block_header_margin: 0.10,
            column_right_threshold: 0.85,
            column_left_threshold: 0.15,
        }
    }
}

impl AnalyzerConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| {
            BlattwerkError::Config(format!("{}: {}", path.display(), err))
        })
    }

    /// Every nonsensical setting, as human-readable problem strings.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let ratios = [
            ("header_footer_margin", self.header_footer_margin),
            ("block_header_margin", self.block_header_margin),
            ("column_right_threshold", self.column_right_threshold),
            ("column_left_threshold", self.column_left_threshold),
        ];
        for (name, value) in ratios {
            if !(value > 0.0 && value < 1.0) {
                problems.push(format!("{} must lie in (0, 1), got {}", name, value));
            }
        }
        if self.column_left_threshold >= self.column_right_threshold {
            problems.push(format!(
                "column_left_threshold {} must be below column_right_threshold {}",
                self.column_left_threshold, self.column_right_threshold
            ));
        }
        if self.workers == 0 {
            problems.push("workers must be at least 1".into());
        }
        if self.dpi == 0 {
            problems.push("dpi must be positive".into());
        }
        if self.recognition_timeout_ms == 0 {
            problems.push("recognition_timeout_ms must be positive".into());
        }
        if !(self.table_detect_min_area.is_finite() && self.table_detect_min_area >= 0.0) {
            problems.push(format!(
                "table_detect_min_area must be non-negative, got {}",
                self.table_detect_min_area
            ));
        }
        if !(0.0..=100.0).contains(&self.low_conf_threshold) {
            problems.push(format!(
                "low_conf_threshold must lie in [0, 100], got {}",
                self.low_conf_threshold
            ));
        }
        problems
    }

    /// Replace every invalid setting with its default.
    ///
    /// Returns the repaired configuration plus the problems found, so a run
    /// can report them once and carry on.
    pub fn sanitized(mut self) -> (Self, Vec<String>) {
        let problems = self.validate();
        if problems.is_empty() {
            return (self, problems);
        }
        let defaults = Self::default();
        let ratio_ok = |v: f64| v > 0.0 && v < 1.0;
        if !ratio_ok(self.header_footer_margin) {
            self.header_footer_margin = defaults.header_footer_margin;
        }
        if !ratio_ok(self.block_header_margin) {
            self.block_header_margin = defaults.block_header_margin;
        }
        if !ratio_ok(self.column_right_threshold)
            || !ratio_ok(self.column_left_threshold)
            || self.column_left_threshold >= self.column_right_threshold
        {
            self.column_right_threshold = defaults.column_right_threshold;
            self.column_left_threshold = defaults.column_left_threshold;
        }
        if self.workers == 0 {
            self.workers = defaults.workers;
        }
        if self.dpi == 0 {
            self.dpi = defaults.dpi;
        }
        if self.recognition_timeout_ms == 0 {
            self.recognition_timeout_ms = defaults.recognition_timeout_ms;
        }
        if !(self.table_detect_min_area.is_finite() && self.table_detect_min_area >= 0.0) {
            self.table_detect_min_area = defaults.table_detect_min_area;
        }
        if !(0.0..=100.0).contains(&self.low_conf_threshold) {
            self.low_conf_threshold = defaults.low_conf_threshold;
        }
        (self, problems)
    }
}
