// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Default output locations when no `--out` directory is given.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// Application data directory, `$XDG_DATA_HOME/blattwerk` on most systems.
pub fn data_dir() -> PathBuf {
    data_base().join("blattwerk")
}

/// Fresh per-run directory under `runs/`, named after the input file stem
/// and the current UTC time. Not created here; export creates it.
pub fn run_dir(input: &Path) -> PathBuf {
    run_dir_in(&data_dir().join("runs"), input)
}

fn run_dir_in(base: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    base.join(format!("{}-{}", stem, Utc::now().format("%Y%m%dT%H%M%S")))
}

fn data_base() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
