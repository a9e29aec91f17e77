// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typographic cues from block text and font metadata.

use std::sync::LazyLock;

use regex::Regex;

const BULLETS: &[&str] = &["- ", "* ", "+ ", "\u{2022}"];

/// Font flag bit marking bold spans in native text layers.
const BOLD_FLAG: u32 = 2;

static ENUMERATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+[).]|[a-zA-Z][).])\s+").expect("valid list regex"));

/// Share of alphabetic characters that are uppercase.
pub fn upper_ratio(text: &str) -> f64 {
    let (letters, upper) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(n, u), c| (n + 1, u + c.is_uppercase() as usize));
    if letters == 0 {
        return 0.0;
    }
    upper as f64 / letters as f64
}

pub fn is_upper(text: &str) -> bool {
    upper_ratio(text) >= 0.75
}

pub fn is_bold(font_name: Option<&str>, font_flags: Option<u32>) -> bool {
    font_name.is_some_and(|name| name.to_lowercase().contains("bold"))
        || font_flags.is_some_and(|flags| flags & BOLD_FLAG != 0)
}

/// Short, shouting or large text reads as a heading.
///
/// `page_mean_font` is the mean font size over the page's blocks.
pub fn heading_like(text: &str, line_count: usize, font_size: Option<f64>, page_mean_font: Option<f64>) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let words = trimmed.split_whitespace().count();
    if words > 12 {
        return false;
    }
    let ratio = upper_ratio(trimmed);
    if ratio >= 0.6 && words <= 8 {
        return true;
    }
    if let Some(size) = font_size.filter(|s| *s > 0.0) {
        let mean = page_mean_font.unwrap_or(size);
        if size >= (mean * 1.2).max(14.0) {
            return true;
        }
    }
    line_count == 1 && words <= 6 && ratio >= 0.4
}

pub fn list_like(text: &str) -> bool {
    let stripped = text.trim_start();
    if stripped.is_empty() {
        return false;
    }
    BULLETS.iter().any(|b| stripped.starts_with(*b)) || ENUMERATED.is_match(stripped)
}

/// Leading bullet or `1.` / `a)` style marker.
pub fn numbering_marker(text: &str) -> Option<String> {
    let stripped = text.trim_start();
    if let Some(bullet) = BULLETS.iter().find(|b| stripped.starts_with(**b)) {
        return Some(bullet.trim().to_string());
    }
    let mut chars = stripped.chars();
    let (first, second) = (chars.next()?, chars.next()?);
    if stripped.chars().count() >= 3 && (first.is_ascii_digit() || first.is_alphabetic()) && matches!(second, '.' | ')') {
        return Some(format!("{}{}", first, second));
    }
    None
}
