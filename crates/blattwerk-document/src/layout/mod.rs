// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout reconstruction: text blocks, typographic style cues, zones and words.

pub mod blocks;
pub mod style;
pub mod zones;

pub use blocks::{LayoutParams, PageBlocks, build_blocks};
pub use zones::{page_words, page_zones};
