// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document consolidation: folds page reports, in page order, into one
// `DocMeta`. The result is built fully in memory; nothing is persisted here.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use blattwerk_core::geometry::round_to;
use blattwerk_core::records::{
    CoordinateSystem, DetectedLanguages, DocMeta, FileIdentity, FileType, LocaleHints, PerPageStat,
    QaReport, Timings,
};
use blattwerk_core::review::{Severity, describe_flag, describe_warning, parse_warning};
use blattwerk_core::types::{LangHint, SourceMode};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::page::PageReport;
use crate::stats::{LOW_CONF_FLAG, LOW_TEXT_FLAG};

pub const READER_VERSION: &str = "blattwerk-1";
pub const BBOX_ORIGIN: &str = "bottom-left";

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Identity of the analyzed file. The family comes from the extension.
pub fn file_identity(name: &str, bytes: Option<&[u8]>) -> FileIdentity {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    FileIdentity {
        name: name.to_string(),
        file_type: FileType::from_extension(extension),
        content_hash: bytes.map(hash_bytes),
        size_bytes: bytes.map(|b| b.len() as u64),
    }
}

/// Document-level facts known before page results arrive.
#[derive(Debug, Clone)]
pub struct DocumentFacts {
    pub file: FileIdentity,
    pub pages_count: u32,
    pub ocr_langs: String,
    /// Language detected upstream for the whole file.
    pub detection_hint: LangHint,
    /// Document-level recognition confidence reported upstream.
    pub doc_ocr_conf: Option<f64>,
    pub cancelled: bool,
    /// Run-level warnings (`config:`, `run_cancelled:`), listed first.
    pub warnings: Vec<String>,
    /// Run-level stage times, merged with the page stages.
    pub timings: Timings,
}

impl DocumentFacts {
    pub fn new(file: FileIdentity, pages_count: u32) -> Self {
        Self {
            file,
            pages_count,
            ocr_langs: String::new(),
            detection_hint: LangHint::Unknown,
            doc_ocr_conf: None,
            cancelled: false,
            warnings: Vec::new(),
            timings: Timings::zeroed(),
        }
    }
}

/// Fold page reports into the document record.
pub fn consolidate(facts: DocumentFacts, mut reports: Vec<PageReport>) -> DocMeta {
    reports.sort_by_key(|r| r.page);

    let mut meta = DocMeta {
        run_id: Uuid::new_v4(),
        created_at: Utc::now(),
        reader_version: READER_VERSION.to_string(),
        coordinate_system: CoordinateSystem {
            unit: facts.file.file_type.coordinate_unit().to_string(),
            bbox_origin: BBOX_ORIGIN.to_string(),
        },
        file: facts.file,
        pages_count: facts.pages_count,
        pages_completed: reports.len() as u32,
        cancelled: facts.cancelled,
        has_text_layer: reports.iter().any(|r| r.has_text_layer),
        ocr_used: reports.iter().any(|r| r.ocr_used),
        ocr_langs: facts.ocr_langs,
        avg_ocr_conf: 0.0,
        detected_languages: detected_languages(facts.detection_hint, &reports),
        locale_hints: locale_hints(facts.detection_hint, &reports),
        preprocess_applied: Vec::new(),
        timings: facts.timings,
        warnings: Vec::new(),
        logs: Vec::new(),
        processing_log: Vec::new(),
        per_page: Vec::with_capacity(reports.len()),
        text_blocks: Vec::new(),
        tables: Vec::new(),
        table_candidates: Vec::new(),
        artifacts: Vec::new(),
        words: Vec::new(),
        zones: Vec::new(),
        qa: QaReport::default(),
    };

    let mut warnings = facts.warnings;
    for report in reports {
        for (stage, ms) in &report.timings.stages {
            meta.timings.add(stage, *ms);
        }
        for step in report.preprocess_applied {
            if !meta.preprocess_applied.contains(&step) {
                meta.preprocess_applied.push(step);
            }
        }
        warnings.extend(report.warnings);
        meta.processing_log.extend(report.logs);
        meta.per_page.push(report.stat);
        meta.text_blocks.extend(report.blocks);
        meta.tables.extend(report.tables);
        meta.table_candidates.extend(report.candidates);
        meta.artifacts.extend(report.artifacts);
        meta.words.extend(report.words);
        meta.zones.extend(report.zones);
    }

    for code in warnings {
        if !meta.warnings.contains(&code) {
            meta.warnings.push(code);
        }
    }
    meta.logs = meta.processing_log.iter().map(|e| e.summary()).collect();
    meta.avg_ocr_conf = avg_ocr_conf(&meta.per_page, facts.doc_ocr_conf);
    meta.qa = qa_report(&meta.per_page, &meta.warnings);

    info!(
        pages = meta.pages_completed,
        of = meta.pages_count,
        blocks = meta.text_blocks.len(),
        tables = meta.tables.len(),
        warnings = meta.warnings.len(),
        needs_review = meta.qa.needs_review,
        "Document consolidated"
    );
    meta
}

// -- Languages and locales ----------------------------------------------------

fn hint_languages(hint: LangHint) -> Vec<String> {
    match hint {
        LangHint::De => vec!["de".into()],
        LangHint::En => vec!["en".into()],
        LangHint::Mixed => vec!["de".into(), "en".into()],
        LangHint::Unknown => Vec::new(),
    }
}

fn page_languages(report: &PageReport) -> Vec<String> {
    match report.stat.lang {
        Some(lang) => lang.langs().iter().map(|l| l.code().to_string()).collect(),
        None => hint_languages(report.lang_hint),
    }
}

/// Per-page and overall language codes, seeded with the upstream hint;
/// `["und"]` when nothing was found.
pub fn detected_languages(detection_hint: LangHint, reports: &[PageReport]) -> DetectedLanguages {
    let mut overall: BTreeSet<String> = hint_languages(detection_hint).into_iter().collect();
    let mut by_page = BTreeMap::new();
    for report in reports {
        let langs = page_languages(report);
        overall.extend(langs.iter().cloned());
        by_page.insert(report.page, langs);
    }
    let overall: Vec<String> = if overall.is_empty() {
        vec!["und".to_string()]
    } else {
        overall.into_iter().collect()
    };
    DetectedLanguages {
        doc: overall.join("+"),
        overall,
        by_page,
    }
}

/// Locale hints folded over the lattice, seeded with the upstream hint.
pub fn locale_hints(detection_hint: LangHint, reports: &[PageReport]) -> LocaleHints {
    let mut hints = LocaleHints {
        overall: detection_hint,
        ..LocaleHints::default()
    };
    for report in reports {
        let page_hint = report.locale_hint.merge(report.lang_hint);
        hints.by_page.insert(report.page, page_hint);
        hints.overall = hints.overall.merge(page_hint);
        hints.numbers_locale = hints.numbers_locale.merge(report.numbers_locale);
        hints.dates_locale = hints.dates_locale.merge(report.dates_locale);
    }
    debug!(overall = hints.overall.as_str(), "Locale hints merged");
    hints
}

/// Mean recognition confidence over pages whose source is `ocr`. Mixed
/// pages carry a blended confidence and are left out.
///
/// Falls back to the document-level value, then to 0.
pub fn avg_ocr_conf(per_page: &[PerPageStat], doc_conf: Option<f64>) -> f64 {
    let values: Vec<f64> = per_page
        .iter()
        .filter(|s| s.source == SourceMode::Ocr)
        .filter_map(|s| s.ocr_conf)
        .collect();
    if !values.is_empty() {
        return round_to(values.iter().sum::<f64>() / values.len() as f64, 2);
    }
    doc_conf.map_or(0.0, |c| round_to(c, 2))
}

// -- QA -----------------------------------------------------------------------

fn is_table_failure(code: &str) -> bool {
    matches!(parse_warning(code).0, "table_render_error" | "table_extract_error")
}

/// Review summary over page flags and run warnings.
pub fn qa_report(per_page: &[PerPageStat], warnings: &[String]) -> QaReport {
    let mut qa = QaReport {
        warnings: warnings.len(),
        tables_fail: warnings.iter().filter(|w| is_table_failure(w)).count(),
        ..QaReport::default()
    };

    for stat in per_page {
        if !stat.flags.is_empty() {
            qa.pages.push(stat.page);
        }
        if stat.flags.iter().any(|f| f == LOW_CONF_FLAG) {
            qa.low_conf_pages.push(stat.page);
        }
        if stat.flags.iter().any(|f| f == LOW_TEXT_FLAG) {
            qa.low_text_pages.push(stat.page);
        }
        for flag in &stat.flags {
            let note = describe_flag(flag, stat.page);
            if note.severity >= Severity::Review && !qa.reasons.contains(&note.message) {
                qa.reasons.push(note.message);
            }
        }
    }
    for code in warnings {
        let note = describe_warning(code);
        if note.severity >= Severity::Review && !qa.reasons.contains(&note.message) {
            qa.reasons.push(note.message);
        }
    }

    qa.needs_review = !qa.reasons.is_empty();
    qa.summary = if qa.needs_review {
        format!(
            "{} page(s) flagged, {} warning(s), {} table failure(s)",
            qa.pages.len(),
            qa.warnings,
            qa.tables_fail
        )
    } else {
        "no issues".to_string()
    };
    qa
}
