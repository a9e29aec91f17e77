// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table candidate scoring: confidence, qualitative cues, inferred method and
// text overlap. Pure functions over explicit inputs so failed and rejected
// candidates score the same way as successful ones.

use blattwerk_core::geometry::{BBox, round_to};
use blattwerk_core::records::{
    GridGeometry, TableCandidate, TableCue, TableMethod, TableMetrics, TableStatus, TableTool,
};
use blattwerk_core::types::TextBlock;

/// Cell count at which the richness bonus saturates.
const RICH_CELLS: f64 = 200.0;
const MAX_RICHNESS_BONUS: f64 = 0.25;

/// Confidence in `[0, 1]`, rounded to 4 decimals.
pub fn table_confidence(status: TableStatus, metrics: &TableMetrics) -> f64 {
    let richness = (metrics.cell_count as f64 / RICH_CELLS).min(1.0) * MAX_RICHNESS_BONUS;
    let structure = if metrics.rows >= 2 && metrics.cols >= 2 {
        0.25
    } else if metrics.rows >= 1 && metrics.cols >= 1 {
        0.10
    } else {
        0.0
    };
    round_to((status.base_confidence() + richness + structure).clamp(0.0, 1.0), 4)
}

/// Qualitative cues. Never empty.
pub fn table_cues(geometry: &GridGeometry, metrics: &TableMetrics) -> Vec<TableCue> {
    let mut cues = Vec::new();
    if geometry.has_lines() {
        cues.push(TableCue::Rulings);
    }
    if metrics.cols >= 3 {
        cues.push(TableCue::Columns);
    }
    if metrics.rows >= 2 && metrics.cols >= 2 {
        cues.push(TableCue::Grid);
    }
    if cues.is_empty() {
        cues.push(TableCue::Layout);
    }
    cues
}

pub fn table_method(geometry: &GridGeometry, tool: TableTool) -> TableMethod {
    if geometry.has_lines() && tool != TableTool::Ocr {
        TableMethod::Morph
    } else {
        TableMethod::TextAlignment
    }
}

/// Recognition-sourced pages use the `ocr` tool label.
pub fn table_tool(decision: &str) -> TableTool {
    if decision.to_ascii_lowercase().contains("ocr") {
        TableTool::Ocr
    } else {
        TableTool::Grid
    }
}

/// Whether `bbox` touches any text block on `page`.
pub fn overlaps_text(bbox: Option<&BBox>, page: u32, blocks: &[TextBlock]) -> bool {
    let Some(bbox) = bbox else {
        return false;
    };
    blocks
        .iter()
        .filter(|block| block.page == page)
        .any(|block| block.bbox.intersects(bbox))
}

/// Everything the scorer needs to know about one detected region.
#[derive(Debug, Clone)]
pub struct CandidateInput<'a> {
    pub page: u32,
    pub status: TableStatus,
    pub metrics: &'a TableMetrics,
    pub geometry: &'a GridGeometry,
    pub bbox: Option<BBox>,
    pub decision: &'a str,
    pub rotation_deg: u32,
}

/// Score a region into an auditable candidate record.
pub fn build_candidate(input: CandidateInput<'_>, blocks: &[TextBlock]) -> TableCandidate {
    let tool = table_tool(input.decision);
    let bbox = input.bbox.map(|b| b.rounded(3));
    TableCandidate {
        page: input.page,
        overlaps_text: overlaps_text(bbox.as_ref(), input.page, blocks),
        bbox,
        confidence: table_confidence(input.status, input.metrics),
        cues: table_cues(input.geometry, input.metrics),
        method: table_method(input.geometry, tool),
        gridlines_h: input.geometry.row_lines.len() as u32,
        gridlines_v: input.geometry.col_lines.len() as u32,
        rotation_deg: input.rotation_deg,
        status: input.status,
        tool,
        decision: input.decision.to_string(),
        rows: input.metrics.rows,
        cols: input.metrics.cols,
        cell_count: input.metrics.cell_count,
        avg_cell_area: round_to(input.metrics.avg_cell_area, 3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::{BlockLang, BlockType, ParagraphStyle, SourceMode};

    fn metrics(rows: u32, cols: u32) -> TableMetrics {
        TableMetrics {
            rows,
            cols,
            cell_count: rows * cols,
            avg_cell_height: 10.0,
            avg_cell_width: 10.0,
            avg_cell_area: 100.0,
        }
    }

    fn lined() -> GridGeometry {
        GridGeometry {
            row_lines: vec![10, 20],
            col_lines: vec![10, 20, 30],
            image_width: 100,
            image_height: 100,
        }
    }

    fn block(page: u32, bbox: BBox) -> TextBlock {
        TextBlock {
            id: "p1-b0".into(),
            page,
            text: "Rechnung".into(),
            lines: vec!["Rechnung".into()],
            bbox,
            reading_order_index: 0,
            lang: BlockLang::De,
            lang_conf: 0.95,
            is_heading: false,
            is_list: false,
            is_bold: false,
            is_upper: false,
            paragraph_style: ParagraphStyle::Body,
            list_level: 0,
            line_height: bbox.height(),
            baseline: bbox.y0,
            column_index: 0,
            indent_level: 0,
            numbering_marker: None,
            block_type: BlockType::Paragraph,
            font_size: None,
            ocr_conf_avg: None,
            token_count: 1,
            char_count: 8,
            source: SourceMode::Text,
        }
    }

    #[test]
    fn confidence_grows_with_cells() {
        let grid = |cells: u32| TableMetrics {
            cell_count: cells,
            ..metrics(2, 2)
        };
        let none = table_confidence(TableStatus::Detect, &grid(0));
        let hundred = table_confidence(TableStatus::Detect, &grid(100));
        let many = table_confidence(TableStatus::Detect, &grid(300));
        assert!(none <= hundred && hundred <= many);
        assert_eq!(many, 1.0);
        assert_eq!(hundred, 0.875);
    }

    #[test]
    fn failed_empty_grid_keeps_base() {
        let empty = TableMetrics::default();
        assert_eq!(table_confidence(TableStatus::Failed, &empty), 0.2);
        assert_eq!(table_confidence(TableStatus::Ok, &metrics(1, 2)), 0.9525);
    }

    #[test]
    fn cues_never_empty() {
        let cues = table_cues(&GridGeometry::empty(10, 10), &TableMetrics::default());
        assert_eq!(cues, vec![TableCue::Layout]);
        let cues = table_cues(&lined(), &metrics(2, 3));
        assert_eq!(cues, vec![TableCue::Rulings, TableCue::Columns, TableCue::Grid]);
    }

    #[test]
    fn method_depends_on_lines_and_tool() {
        assert_eq!(table_method(&lined(), TableTool::Grid), TableMethod::Morph);
        assert_eq!(table_method(&lined(), TableTool::Ocr), TableMethod::TextAlignment);
        assert_eq!(
            table_method(&GridGeometry::empty(1, 1), TableTool::Grid),
            TableMethod::TextAlignment
        );
        assert_eq!(table_tool("native+ocr"), TableTool::Ocr);
        assert_eq!(table_tool("native"), TableTool::Grid);
    }

    #[test]
    fn overlap_only_counts_same_page() {
        let table = BBox::new(0.0, 0.0, 100.0, 100.0).unwrap();
        let inside = block(1, BBox::new(50.0, 50.0, 60.0, 60.0).unwrap());
        let elsewhere = block(2, BBox::new(50.0, 50.0, 60.0, 60.0).unwrap());
        let apart = block(1, BBox::new(200.0, 200.0, 260.0, 260.0).unwrap());
        assert!(overlaps_text(Some(&table), 1, &[apart.clone(), inside]));
        assert!(!overlaps_text(Some(&table), 1, &[apart, elsewhere]));
        assert!(!overlaps_text(None, 1, &[]));
    }

    #[test]
    fn candidate_rounds_geometry() {
        let m = metrics(1, 2);
        let geometry = lined();
        let candidate = build_candidate(
            CandidateInput {
                page: 3,
                status: TableStatus::Detect,
                metrics: &m,
                geometry: &geometry,
                bbox: Some(BBox::new(1.23456, 2.0, 10.98765, 20.0).unwrap()),
                decision: "native",
                rotation_deg: 90,
            },
            &[],
        );
        assert_eq!(candidate.bbox.unwrap().to_array(), [1.235, 2.0, 10.988, 20.0]);
        assert_eq!((candidate.gridlines_h, candidate.gridlines_v), (2, 3));
        assert_eq!(candidate.tool, TableTool::Grid);
        assert_eq!(candidate.rotation_deg, 90);
    }
}
