// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON and JSON Lines export of the document record and its parallel
// collections.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use blattwerk_core::error::Result;
use blattwerk_core::records::DocMeta;
use serde::Serialize;
use tracing::{debug, info, instrument};

pub const DOC_META_FILE: &str = "doc_meta.json";
pub const PER_PAGE_FILE: &str = "per_page_stats.jsonl";
pub const TEXT_BLOCKS_FILE: &str = "text_blocks.jsonl";
pub const TABLE_CANDIDATES_FILE: &str = "table_candidates.jsonl";
pub const ARTIFACTS_FILE: &str = "visual_artifacts.jsonl";

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    debug!(path = %path.display(), "JSON written");
    Ok(())
}

/// Write one compact JSON object per line. Returns the number of lines.
pub fn write_jsonl<T: Serialize>(path: impl AsRef<Path>, items: &[T]) -> Result<usize> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    debug!(path = %path.display(), lines = items.len(), "JSONL written");
    Ok(items.len())
}

/// Write the full run output into `dir` and return the written paths.
#[instrument(skip(meta), fields(dir = %dir.as_ref().display()))]
pub fn export_run(dir: impl AsRef<Path>, meta: &DocMeta) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let doc_meta = dir.join(DOC_META_FILE);
    write_json(&doc_meta, meta)?;
    let per_page = dir.join(PER_PAGE_FILE);
    write_jsonl(&per_page, &meta.per_page)?;
    let blocks = dir.join(TEXT_BLOCKS_FILE);
    write_jsonl(&blocks, &meta.text_blocks)?;
    let candidates = dir.join(TABLE_CANDIDATES_FILE);
    write_jsonl(&candidates, &meta.table_candidates)?;
    let artifacts = dir.join(ARTIFACTS_FILE);
    write_jsonl(&artifacts, &meta.artifacts)?;

    info!(
        pages = meta.per_page.len(),
        blocks = meta.text_blocks.len(),
        candidates = meta.table_candidates.len(),
        artifacts = meta.artifacts.len(),
        "Run exported"
    );
    Ok(vec![doc_meta, per_page, blocks, candidates, artifacts])
}
