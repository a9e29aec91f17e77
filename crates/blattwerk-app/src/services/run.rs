// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One command-line run: load configuration and input, wire capabilities,
// analyze, export.
//
// Two inputs are understood. A `.json` file is a serialised document
// description (pages with bitmap paths and raw text records). A `.pdf` is
// opened directly and its text layer becomes the native-text capability.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use blattwerk_bridge::{Capabilities, unavailable_capabilities};
use blattwerk_core::config::AnalyzerConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::records::DocMeta;
use blattwerk_document::{DocumentAnalyzer, DocumentInput, PdfTextSource, export_run};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub out: PathBuf,
    pub workers: Option<usize>,
    /// Directory holding the recognition models.
    pub models: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub meta: DocMeta,
    pub files: Vec<PathBuf>,
}

/// Load the configuration file if given, then apply command-line overrides.
pub fn load_config(path: Option<&Path>, workers: Option<usize>) -> Result<AnalyzerConfig> {
    let mut config = match path {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(workers) = workers {
        config.workers = workers;
    }
    Ok(config)
}

/// Read the input file into a document plus the capabilities it brings.
#[instrument(skip(caps), fields(input = %path.display()))]
pub fn load_document(path: &Path, caps: Capabilities) -> Result<(DocumentInput, Capabilities)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path)?;
            let source = PdfTextSource::from_bytes(&bytes)?;
            let pages = source.page_inputs();
            info!(pages = pages.len(), "PDF input loaded");
            let input = DocumentInput::new(file_name(path), pages).with_bytes(bytes);
            Ok((input, caps.with_native_text(Arc::new(source))))
        }
        "json" => Ok((load_description(path)?, caps)),
        other => Err(BlattwerkError::UnsupportedDocument(format!(
            "{}: expected .pdf or .json, got '{}'",
            path.display(),
            other
        ))),
    }
}

/// Parse a document description. Relative bitmap paths resolve against the
/// description's own directory.
fn load_description(path: &Path) -> Result<DocumentInput> {
    let raw = std::fs::read_to_string(path)?;
    let mut input: DocumentInput = serde_json::from_str(&raw)?;
    if input.name.is_empty() {
        input.name = file_name(path);
    }
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for page in &mut input.pages {
        if let Some(image) = page.image_path.as_mut()
            && image.is_relative()
        {
            *image = base.join(&*image);
        }
    }
    info!(name = %input.name, pages = input.pages.len(), "Document description loaded");
    Ok(input)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(feature = "ocr")]
fn with_recognizer(caps: Capabilities, models: Option<&Path>) -> Capabilities {
    use blattwerk_document::{OcrModels, OcrsRecognizer};

    let models = models.map_or_else(OcrModels::default, OcrModels::from_dir);
    match OcrsRecognizer::new(&models) {
        Ok(recognizer) => caps.with_recognizer(Arc::new(recognizer)),
        Err(err) => {
            warn!(error = %err, "Recognition engine unavailable, continuing without it");
            caps
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn with_recognizer(caps: Capabilities, models: Option<&Path>) -> Capabilities {
    if let Some(dir) = models {
        warn!(models = %dir.display(), "Built without the `ocr` feature, ignoring models");
    }
    caps
}

/// Analyze the request's input and write the output files.
///
/// Ctrl-C cancels the run; pages finished by then are still exported.
pub async fn run(request: &RunRequest) -> Result<RunOutcome> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            let _ = cancel_tx.send(true);
        }
    });
    let outcome = run_with_cancel(request, cancel_rx).await;
    watcher.abort();
    outcome
}

pub async fn run_with_cancel(request: &RunRequest, cancel: watch::Receiver<bool>) -> Result<RunOutcome> {
    let config = load_config(request.config.as_deref(), request.workers)?;
    let caps = with_recognizer(unavailable_capabilities(), request.models.as_deref());
    let (input, caps) = load_document(&request.input, caps)?;

    let analyzer = DocumentAnalyzer::new(config, caps);
    let meta = analyzer.analyze_with_cancel(input, cancel).await;

    let files = export_run(&request.out, &meta)?;
    if let Some(extra) = analyzer.config().export_dir.as_ref()
        && extra != &request.out
    {
        export_run(extra, &meta)?;
    }
    Ok(RunOutcome { meta, files })
}
