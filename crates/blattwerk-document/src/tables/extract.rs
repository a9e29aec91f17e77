// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page table pass: render, scan for a ruled grid, apply the detect-only
// or extraction policy, and score the result into auditable records.
//
// Nothing here returns an error to the caller. Render and extraction
// failures become `failed` (or `fallback`) records plus warning codes.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use blattwerk_bridge::{PageRenderer, Recognizer};
use blattwerk_core::config::{AnalyzerConfig, TablesMode};
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::geometry::{BBox, PageSize};
use blattwerk_core::records::{
    GridGeometry, LogEntry, TableCandidate, TableCell, TableMetrics, TableRecord, TableStatus,
};
use blattwerk_core::types::TextBlock;
use image::DynamicImage;
use tracing::{debug, instrument, warn};

use super::grid::{GridScan, scan_grid};
use super::scoring::{CandidateInput, build_candidate, table_tool};

/// Rendering never drops below 2x (144 dpi).
const MIN_ZOOM: f64 = 2.0;

/// One page as seen by the table pass.
#[derive(Debug, Clone, Copy)]
pub struct TablePage<'a> {
    pub page: u32,
    /// Page size in document units.
    pub size: PageSize,
    pub decision: &'a str,
    /// DPI suggested by upstream recognition for this page.
    pub dpi_hint: Option<u32>,
    /// Pre-rendered bitmap, used when no renderer is available. Already
    /// turned upright by `rotation`.
    pub bitmap: Option<&'a DynamicImage>,
    /// Blocks already reconstructed for the page (document space).
    pub blocks: &'a [TextBlock],
    /// Text recognized for the page by other means.
    pub fallback_text: Option<&'a str>,
    /// Clockwise orientation correction applied to `bitmap`.
    pub rotation: u32,
}

/// A page image ready for scanning, with the page frame it depicts.
struct PageImage {
    image: DynamicImage,
    zoom: f64,
    frame: PageSize,
}

/// Raw result of the grid pass for one page.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    /// `Ok` for an accepted grid in either mode.
    pub status: TableStatus,
    pub rows: Vec<Vec<String>>,
    pub metrics: TableMetrics,
    pub geometry: GridGeometry,
}

#[derive(Debug, Clone, Default)]
pub struct TablePageResult {
    pub outcome: Option<TableOutcome>,
    pub candidate: Option<TableCandidate>,
    pub table: Option<TableRecord>,
    pub warnings: Vec<String>,
    pub logs: Vec<LogEntry>,
    pub detect_ms: f64,
    pub extract_ms: f64,
}

/// Table pass configured once per run.
pub struct TableExtractor {
    mode: TablesMode,
    ocr_cells: bool,
    min_words: usize,
    min_area: f64,
    max_cells: u32,
    dpi: u32,
    detect_dpi_floor: u32,
    extract_dpi_floor: u32,
    allow_borderless: bool,
    export_dir: Option<PathBuf>,
    lang_hint: String,
    renderer: Arc<dyn PageRenderer>,
    recognizer: Arc<dyn Recognizer>,
}

impl TableExtractor {
    pub fn from_config(
        config: &AnalyzerConfig,
        renderer: Arc<dyn PageRenderer>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        Self {
            mode: config.tables_mode,
            ocr_cells: config.tables_ocr_cells,
            min_words: config.tables_min_words,
            min_area: config.table_detect_min_area,
            max_cells: config.table_detect_max_cells,
            dpi: config.dpi,
            detect_dpi_floor: config.table_detect_dpi_floor,
            extract_dpi_floor: config.table_extract_dpi_floor,
            allow_borderless: config.allow_borderless,
            export_dir: config.export_dir.clone(),
            lang_hint: config.ocr_langs.clone(),
            renderer,
            recognizer,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != TablesMode::Off
    }

    /// Render zoom for a page: detect-only needs far less than cell OCR.
    pub fn zoom_for(&self, dpi_hint: Option<u32>) -> f64 {
        let dpi = if self.mode.is_detect_only() {
            self.dpi.max(self.detect_dpi_floor)
        } else {
            match dpi_hint.filter(|d| *d > 0) {
                Some(hint) => hint,
                None => self.dpi.max(self.extract_dpi_floor),
            }
        };
        (dpi as f64 / 72.0).max(MIN_ZOOM)
    }

    /// Run the table pass for one page.
    #[instrument(skip(self, page), fields(page = page.page, mode = ?self.mode))]
    pub fn process_page(&self, page: &TablePage<'_>) -> TablePageResult {
        let mut result = TablePageResult::default();
        if !self.is_enabled() {
            return result;
        }
        let started = Instant::now();
        let detect_only = self.mode.is_detect_only();

        match self.page_image(page) {
            Ok(rendered) => self.scan_page(page, &rendered, &mut result),
            Err(err) => {
                let code = format!("table_render_error:p{}:{}", page.page, err);
                warn!(page = page.page, code = %code, "Table render failed");
                result.warnings.push(code);
                self.record_failure(page, &mut result);
            }
        }

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        if detect_only {
            result.detect_ms = elapsed;
        } else {
            result.extract_ms = elapsed;
        }
        debug!(page = page.page, elapsed_ms = elapsed, "Table pass finished");
        result
    }

    /// Fresh renders show the page as stored; the normalized bitmap shows it
    /// upright, so a quarter-turn correction swaps the frame's sides.
    fn page_image(&self, page: &TablePage<'_>) -> Result<PageImage> {
        if self.renderer.is_available() {
            let zoom = self.zoom_for(page.dpi_hint);
            return Ok(PageImage {
                image: self.renderer.render(page.page, zoom)?,
                zoom,
                frame: page.size,
            });
        }
        match page.bitmap {
            Some(bitmap) => {
                let frame = page.size.turned(page.rotation);
                Ok(PageImage {
                    image: bitmap.clone(),
                    zoom: bitmap.width() as f64 / frame.width,
                    frame,
                })
            }
            None => Err(BlattwerkError::Render("no renderer and no page bitmap".to_string())),
        }
    }

    fn scan_page(&self, page: &TablePage<'_>, rendered: &PageImage, result: &mut TablePageResult) {
        let PageImage { image, zoom, frame } = rendered;
        let (zoom, frame) = (*zoom, *frame);
        let detect_only = self.mode.is_detect_only();
        let sensitivity = self.mode.sensitivity();
        let ocr_cells = !detect_only && self.ocr_cells && self.recognizer.is_available();
        let scanned = catch_unwind(AssertUnwindSafe(|| {
            scan_grid(image, sensitivity, ocr_cells, Some(self.recognizer.as_ref()), &self.lang_hint)
        }));
        let scan = match scanned {
            Ok(scan) => scan,
            Err(_) => {
                let code = format!("table_extract_error:p{}:grid scan panicked", page.page);
                warn!(page = page.page, code = %code, "Table extraction failed");
                result.warnings.push(code);
                self.record_failure(page, result);
                return;
            }
        };

        if !scan.has_line_pixels {
            self.save_borderless(page.page, image);
            result.logs.push(LogEntry::new("table", "none", Some(page.page)));
            // The whole page stays on record for audit, without a table.
            let status = if page.fallback_text.is_some_and(|t| !t.trim().is_empty()) {
                TableStatus::Fallback
            } else {
                TableStatus::Failed
            };
            result.candidate = Some(build_candidate(
                CandidateInput {
                    page: page.page,
                    status,
                    metrics: &scan.metrics,
                    geometry: &scan.geometry,
                    bbox: Some(frame.bbox()),
                    decision: page.decision,
                    rotation_deg: page.rotation,
                },
                page.blocks,
            ));
            result.outcome = Some(TableOutcome {
                status: TableStatus::Failed,
                rows: Vec::new(),
                metrics: scan.metrics,
                geometry: scan.geometry,
            });
            return;
        }

        let bbox = grid_bbox(&scan.geometry, zoom, frame.height);
        let (status, rows) = if scan.rows.is_empty() {
            (TableStatus::Failed, Vec::new())
        } else if detect_only {
            self.detect_policy(page.page, &scan, result)
        } else {
            self.extract_policy(&scan)
        };

        result.logs.push(
            LogEntry::new("table", if detect_only { "detect" } else { "extract" }, Some(page.page))
                .with("status", format!("{:?}", status).to_lowercase())
                .with("rows", scan.metrics.rows)
                .with("cols", scan.metrics.cols),
        );

        let candidate = build_candidate(
            CandidateInput {
                page: page.page,
                status,
                metrics: &scan.metrics,
                geometry: &scan.geometry,
                bbox,
                decision: page.decision,
                rotation_deg: page.rotation,
            },
            page.blocks,
        );

        if status.is_realized() {
            result.table = Some(TableRecord {
                page: page.page,
                status,
                tool: candidate.tool,
                bbox: candidate.bbox,
                cells: grid_cells(&scan.geometry, &rows, zoom, frame.height),
                rows: rows.clone(),
                metrics: scan.metrics,
            });
        }
        result.candidate = Some(candidate);
        result.outcome = Some(TableOutcome {
            status: if status.is_realized() { TableStatus::Ok } else { status },
            rows,
            metrics: scan.metrics,
            geometry: scan.geometry,
        });
    }

    /// Geometry-only acceptance with false-positive guards.
    fn detect_policy(
        &self,
        page: u32,
        scan: &GridScan,
        result: &mut TablePageResult,
    ) -> (TableStatus, Vec<Vec<String>>) {
        let metrics = &scan.metrics;
        if metrics.cell_count == 0 || metrics.cell_count > self.max_cells || metrics.avg_cell_area < self.min_area {
            let code = format!(
                "table_candidate_filtered:p{}:cells{}:area{:.0}",
                page, metrics.cell_count, metrics.avg_cell_area
            );
            debug!(page, code = %code, "Table candidate filtered");
            result.warnings.push(code);
            return (TableStatus::Failed, Vec::new());
        }
        let blank = scan
            .rows
            .iter()
            .map(|row| vec![String::new(); row.len()])
            .collect();
        (TableStatus::Detect, blank)
    }

    fn extract_policy(&self, scan: &GridScan) -> (TableStatus, Vec<Vec<String>>) {
        let words: usize = scan
            .rows
            .iter()
            .flatten()
            .map(|cell| cell.split_whitespace().count())
            .sum();
        if words < self.min_words {
            debug!(words, min_words = self.min_words, "Too few words in table cells");
            return (TableStatus::Failed, Vec::new());
        }
        (TableStatus::Ok, scan.rows.clone())
    }

    /// Record a failure, substituting already-recognized page text when present.
    fn record_failure(&self, page: &TablePage<'_>, result: &mut TablePageResult) {
        let fallback = page.fallback_text.map(str::trim).filter(|t| !t.is_empty());
        let status = if fallback.is_some() {
            TableStatus::Fallback
        } else {
            TableStatus::Failed
        };
        let rows: Vec<Vec<String>> = fallback.map(|t| vec![vec![t.to_string()]]).unwrap_or_default();
        let metrics = TableMetrics::default();
        let geometry = GridGeometry::empty(0, 0);
        let candidate = build_candidate(
            CandidateInput {
                page: page.page,
                status,
                metrics: &metrics,
                geometry: &geometry,
                bbox: None,
                decision: page.decision,
                rotation_deg: page.rotation,
            },
            page.blocks,
        );
        if status == TableStatus::Fallback {
            result.table = Some(TableRecord {
                page: page.page,
                status,
                tool: table_tool(page.decision),
                bbox: None,
                rows: rows.clone(),
                cells: Vec::new(),
                metrics,
            });
        }
        result.logs.push(
            LogEntry::new("table", format!("{:?}", status).to_lowercase(), Some(page.page)),
        );
        result.candidate = Some(candidate);
        result.outcome = Some(TableOutcome {
            status,
            rows,
            metrics,
            geometry,
        });
    }

    fn save_borderless(&self, page: u32, image: &DynamicImage) {
        if !self.allow_borderless {
            return;
        }
        let Some(dir) = self.export_dir.as_ref() else {
            return;
        };
        let target = dir.join("tables_pages");
        let path = target.join(format!("p{:04}.png", page));
        let saved = std::fs::create_dir_all(&target)
            .map_err(BlattwerkError::from)
            .and_then(|_| {
                image
                    .save(&path)
                    .map_err(|err| BlattwerkError::Image(format!("failed to save {}: {}", path.display(), err)))
            });
        match saved {
            Ok(()) => debug!(page, path = %path.display(), "Borderless page saved for audit"),
            Err(err) => warn!(page, error = %err, "Could not save borderless page"),
        }
    }
}

/// Grid extent in document space (bottom-left origin).
pub fn grid_bbox(geometry: &GridGeometry, zoom: f64, page_height: f64) -> Option<BBox> {
    let (Some(&y0), Some(&y1)) = (geometry.row_lines.iter().min(), geometry.row_lines.iter().max()) else {
        return None;
    };
    let (Some(&x0), Some(&x1)) = (geometry.col_lines.iter().min(), geometry.col_lines.iter().max()) else {
        return None;
    };
    let render = BBox::new(x0 as f64, y0 as f64, x1 as f64, y1 as f64).ok()?;
    let flipped = render.scale(1.0 / zoom).flip_vertical(page_height);
    flipped.validate().ok().map(|_| flipped)
}

fn grid_cells(geometry: &GridGeometry, rows: &[Vec<String>], zoom: f64, page_height: f64) -> Vec<TableCell> {
    let mut cells = Vec::new();
    for (r, ys) in geometry.row_lines.windows(2).enumerate() {
        for (c, xs) in geometry.col_lines.windows(2).enumerate() {
            let bbox = BBox::new(xs[0] as f64, ys[0] as f64, xs[1] as f64, ys[1] as f64)
                .ok()
                .map(|b| b.scale(1.0 / zoom).flip_vertical(page_height).rounded(3));
            let text = rows
                .get(r)
                .and_then(|row| row.get(c))
                .cloned()
                .unwrap_or_default();
            cells.push(TableCell {
                row: r as u32,
                col: c as u32,
                text,
                bbox,
                row_span: 1,
                col_span: 1,
            });
        }
    }
    cells
}
