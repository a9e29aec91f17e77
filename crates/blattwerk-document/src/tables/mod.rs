// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table detection, extraction and candidate scoring.

pub mod extract;
pub mod grid;
pub mod scoring;

pub use extract::{TableExtractor, TableOutcome, TablePage, TablePageResult};
pub use grid::{GridScan, scan_grid};
