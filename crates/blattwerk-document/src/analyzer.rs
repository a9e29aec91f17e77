// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document analyzer: fans pages out to a bounded pool of blocking workers
// and consolidates their reports in page order.
//
// Workers share nothing mutable: each returns a `PageReport` and the single
// aggregation pass in `meta::consolidate` merges them. A cancelled run still
// consolidates every page that finished before the cancel.

use std::sync::Arc;
use std::time::Instant;

use blattwerk_bridge::Capabilities;
use blattwerk_core::config::AnalyzerConfig;
use blattwerk_core::records::{DocMeta, Timings};
use blattwerk_core::types::LangHint;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::meta::{DocumentFacts, consolidate, file_identity};
use crate::page::{PageContext, PageInput, PageReport, analyze_page};

/// One document to analyze.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInput {
    /// File name; its extension selects the file family.
    pub name: String,
    /// Source bytes, hashed into the file identity when present.
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    /// Precomputed SHA-256 hex, used when `bytes` is absent.
    pub content_hash: Option<String>,
    pub pages: Vec<PageInput>,
    /// Language detected upstream for the whole file (`de`, `en`, `mixed`).
    pub detection_hint: Option<String>,
    /// Document-level recognition confidence reported upstream.
    pub doc_ocr_conf: Option<f64>,
}

impl DocumentInput {
    pub fn new(name: impl Into<String>, pages: Vec<PageInput>) -> Self {
        Self {
            name: name.into(),
            pages,
            ..Self::default()
        }
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = Some(bytes);
        self
    }
}

/// Page-parallel analyzer configured once and reusable across documents.
pub struct DocumentAnalyzer {
    ctx: Arc<PageContext>,
    workers: usize,
    config_warnings: Vec<String>,
}

impl DocumentAnalyzer {
    /// Build an analyzer. Invalid settings fall back to their defaults and
    /// are reported as `config:` warnings on every run.
    pub fn new(config: AnalyzerConfig, caps: Capabilities) -> Self {
        let (config, problems) = config.sanitized();
        for problem in &problems {
            warn!(problem = %problem, "Invalid setting replaced by its default");
        }
        let workers = config.workers.max(1);
        Self {
            ctx: Arc::new(PageContext::new(config, caps)),
            workers,
            config_warnings: problems.into_iter().map(|p| format!("config:{}", p)).collect(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.ctx.config
    }

    /// Analyze every page of `input`.
    pub async fn analyze(&self, input: DocumentInput) -> DocMeta {
        let (_keep, cancel) = watch::channel(false);
        self.analyze_with_cancel(input, cancel).await
    }

    /// Analyze `input`, stopping when `cancel` turns true.
    ///
    /// Pages still queued or running at that point are dropped from the
    /// result; finished pages are consolidated as usual.
    #[instrument(skip(self, input, cancel), fields(name = %input.name, pages = input.pages.len()))]
    pub async fn analyze_with_cancel(&self, input: DocumentInput, mut cancel: watch::Receiver<bool>) -> DocMeta {
        let started = Instant::now();
        let DocumentInput {
            name,
            bytes,
            content_hash,
            pages,
            detection_hint,
            doc_ocr_conf,
        } = input;

        let clock = Instant::now();
        let mut file = file_identity(&name, bytes.as_deref());
        if file.content_hash.is_none() {
            file.content_hash = content_hash;
        }
        let pages_count = pages.len() as u32;
        let mut timings = Timings::zeroed();
        timings.add("detect", clock.elapsed().as_secs_f64() * 1000.0);

        info!(pages = pages_count, workers = self.workers, "Analysis started");
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();
        for (index, mut page_input) in pages.into_iter().enumerate() {
            if page_input.page == 0 {
                page_input.page = index as u32 + 1;
            }
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire().await;
                let page = page_input.page;
                let joined = tokio::task::spawn_blocking(move || analyze_page(&ctx, page_input)).await;
                (page, joined)
            });
        }

        let mut reports: Vec<PageReport> = Vec::with_capacity(pages_count as usize);
        let mut cancelled = *cancel.borrow();
        let mut watching = true;
        while !cancelled {
            tokio::select! {
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((page, outcome))) => reports.push(self.page_outcome(page, outcome)),
                    Some(Err(err)) => warn!(error = %err, "Page task lost"),
                },
                changed = cancel.changed(), if watching => match changed {
                    Ok(()) => cancelled = *cancel.borrow(),
                    Err(_) => watching = false,
                },
            }
        }

        let mut warnings = self.config_warnings.clone();
        if cancelled {
            set.abort_all();
            while let Some(joined) = set.join_next().await {
                if let Ok((page, outcome)) = joined {
                    reports.push(self.page_outcome(page, outcome));
                }
            }
            let code = format!("run_cancelled:completed{}/{}", reports.len(), pages_count);
            warn!(code = %code, "Run cancelled");
            warnings.push(code);
        }

        let mut facts = DocumentFacts::new(file, pages_count);
        facts.ocr_langs = self.ctx.config.ocr_langs.clone();
        facts.detection_hint = detection_hint.as_deref().map_or(LangHint::Unknown, LangHint::parse);
        facts.doc_ocr_conf = doc_ocr_conf;
        facts.cancelled = cancelled;
        facts.warnings = warnings;
        facts.timings = timings;

        let mut meta = consolidate(facts, reports);
        meta.timings.total_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(total_ms = meta.timings.total_ms, "Analysis finished");
        meta
    }

    fn page_outcome(&self, page: u32, outcome: Result<PageReport, tokio::task::JoinError>) -> PageReport {
        match outcome {
            Ok(report) => report,
            Err(err) => {
                let detail = if err.is_panic() { "worker panicked" } else { "worker cancelled" };
                warn!(page, detail, "Page worker failed");
                PageReport::failed(page, detail, &self.ctx.flags)
            }
        }
    }
}

impl std::fmt::Debug for DocumentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAnalyzer")
            .field("ctx", &self.ctx)
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_bridge::{NativeText, NativeTextSource, unavailable_capabilities};
    use blattwerk_core::config::{ModeHint, TablesMode};
    use blattwerk_core::error::Result;
    use blattwerk_core::types::RawBlock;

    struct PanickingSource;

    impl NativeTextSource for PanickingSource {
        fn extract_native_text(&self, page: u32) -> Result<Option<NativeText>> {
            if page == 2 {
                panic!("corrupt text layer");
            }
            Ok(None)
        }
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            mode: ModeHint::Text,
            preprocess: Vec::new(),
            tables_mode: TablesMode::Off,
            workers: 2,
            ..AnalyzerConfig::default()
        }
    }

    fn text_page(page: u32, text: &str) -> PageInput {
        PageInput::new(page, 600.0, 800.0).with_native(NativeText {
            text: text.into(),
            words: Vec::new(),
            blocks: vec![RawBlock {
                text: text.into(),
                bbox: vec![40.0, 200.0, 560.0, 260.0],
                ..RawBlock::default()
            }],
        })
    }

    fn document() -> DocumentInput {
        DocumentInput::new(
            "brief.pdf",
            vec![
                text_page(3, "The invoice date is on page three of this letter"),
                text_page(1, "Sehr geehrte Damen und Herren, die Rechnung ist beigefuegt"),
                text_page(2, "Bitte ueberweisen Sie den Betrag bis zum Monatsende"),
            ],
        )
    }

    #[tokio::test]
    async fn pages_are_consolidated_in_order() {
        let analyzer = DocumentAnalyzer::new(config(), unavailable_capabilities());
        let meta = analyzer.analyze(document().with_bytes(b"%PDF-1.7".to_vec())).await;
        let pages: Vec<u32> = meta.per_page.iter().map(|s| s.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        let block_pages: Vec<u32> = meta.text_blocks.iter().map(|b| b.page).collect();
        assert_eq!(block_pages, vec![1, 2, 3]);
        assert_eq!(meta.pages_completed, 3);
        assert!(!meta.cancelled);
        assert!(meta.has_text_layer);
        assert!(meta.file.content_hash.is_some());
        assert_eq!(meta.detected_languages.doc, "de+en");
        assert!(meta.timings.total_ms > 0.0);
    }

    #[tokio::test]
    async fn missing_page_numbers_are_assigned() {
        let analyzer = DocumentAnalyzer::new(config(), unavailable_capabilities());
        let input = DocumentInput::new(
            "a.pdf",
            vec![text_page(0, "erste Seite und mehr"), text_page(0, "zweite Seite und mehr")],
        );
        let meta = analyzer.analyze(input).await;
        let pages: Vec<u32> = meta.per_page.iter().map(|s| s.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn invalid_config_is_reported_not_fatal() {
        let analyzer = DocumentAnalyzer::new(
            AnalyzerConfig {
                workers: 0,
                ..config()
            },
            unavailable_capabilities(),
        );
        assert_eq!(analyzer.config().workers, 4);
        let meta = analyzer.analyze(document()).await;
        assert_eq!(meta.warnings[0], "config:workers must be at least 1");
        assert_eq!(meta.pages_completed, 3);
    }

    #[tokio::test]
    async fn panicking_worker_degrades_to_failed_page() {
        let caps = unavailable_capabilities().with_native_text(Arc::new(PanickingSource));
        let analyzer = DocumentAnalyzer::new(config(), caps);
        let input = DocumentInput::new(
            "scan.png",
            vec![PageInput::new(1, 100.0, 100.0), PageInput::new(2, 100.0, 100.0)],
        );
        let meta = analyzer.analyze(input).await;
        assert_eq!(meta.pages_completed, 2);
        assert!(meta.warnings.contains(&"page_worker_failed:p2:worker panicked".to_string()));
        assert_eq!(meta.qa.tables_fail, 0);
        assert!(meta.qa.needs_review);
    }

    #[tokio::test]
    async fn cancelled_run_keeps_completed_pages() {
        let analyzer = DocumentAnalyzer::new(config(), unavailable_capabilities());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let meta = analyzer.analyze_with_cancel(document(), rx).await;
        assert!(meta.cancelled);
        assert!(meta.pages_completed <= 3);
        let code = format!("run_cancelled:completed{}/3", meta.pages_completed);
        assert!(meta.warnings.contains(&code));
    }

    #[tokio::test]
    async fn upstream_detection_hint_joins_locale() {
        let analyzer = DocumentAnalyzer::new(config(), unavailable_capabilities());
        let mut input = DocumentInput::new("a.pdf", vec![text_page(1, "Die Rechnung und der Betrag")]);
        input.detection_hint = Some("en".into());
        let meta = analyzer.analyze(input).await;
        assert_eq!(meta.locale_hints.overall, LangHint::Mixed);
    }
}
