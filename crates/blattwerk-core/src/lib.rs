// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — Core types, geometry and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod records;
pub mod review;
pub mod types;

pub use config::{AnalyzerConfig, ModeHint, Sensitivity, TablesMode};
pub use error::{BlattwerkError, Result};
pub use geometry::{BBox, PageSize, round_to};
pub use records::*;
pub use types::*;
