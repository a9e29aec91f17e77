// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Review notes: plain-language descriptions of warning codes and page flags.
//
// Warning codes have the shape `kind:p{page}:{detail}`. Each known kind maps
// to a sentence a reviewer can act on plus a severity that decides whether
// the document needs a human look.

/// How much a note matters to a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Expected filtering, nothing to do.
    Info,
    /// Output is usable but a person should check it.
    Review,
    /// Part of the page could not be processed.
    Failure,
}

/// A warning code or page flag rendered for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewNote {
    pub code: String,
    pub message: String,
    pub severity: Severity,
}

/// Split a warning code into `(kind, page)`.
pub fn parse_warning(code: &str) -> (&str, Option<u32>) {
    let mut parts = code.splitn(3, ':');
    let kind = parts.next().unwrap_or_default();
    let page = parts
        .next()
        .and_then(|p| p.strip_prefix('p'))
        .and_then(|p| p.parse().ok());
    (kind, page)
}

/// Describe a warning code produced during a run.
pub fn describe_warning(code: &str) -> ReviewNote {
    let (kind, page) = parse_warning(code);
    let on_page = page.map(|p| format!(" on page {}", p)).unwrap_or_default();
    let (message, severity) = match kind {
        "table_candidate_filtered" => (
            format!("A grid-like region{} was not treated as a table.", on_page),
            Severity::Info,
        ),
        "table_render_error" => (
            format!("The page image for table detection{} could not be produced.", on_page),
            Severity::Failure,
        ),
        "table_extract_error" => (
            format!("Table extraction{} failed.", on_page),
            Severity::Failure,
        ),
        "recognition_timeout" => (
            format!("Text recognition{} took too long and was skipped.", on_page),
            Severity::Review,
        ),
        "recognition_failed" => (
            format!("Text recognition{} failed.", on_page),
            Severity::Review,
        ),
        "orientation_unavailable" => (
            format!("Page orientation{} could not be checked.", on_page),
            Severity::Info,
        ),
        "invalid_bbox" => (
            format!("A text region{} had unusable coordinates and was dropped.", on_page),
            Severity::Review,
        ),
        "page_missing_image" => (
            format!("No page image was supplied{}.", on_page),
            Severity::Review,
        ),
        "page_worker_failed" => (
            format!("Processing{} stopped unexpectedly.", on_page),
            Severity::Failure,
        ),
        "config" => (
            "A setting was invalid and its default was used.".to_string(),
            Severity::Review,
        ),
        "run_cancelled" => (
            "The run was cancelled before every page finished.".to_string(),
            Severity::Failure,
        ),
        _ => (format!("Unrecognised warning: {}", code), Severity::Review),
    };
    ReviewNote {
        code: code.to_string(),
        message,
        severity,
    }
}

/// Describe a page quality flag.
pub fn describe_flag(flag: &str, page: u32) -> ReviewNote {
    let (message, severity) = match flag {
        "low_conf_page" => (
            format!("Recognition confidence on page {} is low.", page),
            Severity::Review,
        ),
        "low_text_page" => (
            format!("Very little text was recognised on page {}.", page),
            Severity::Review,
        ),
        "suspicious_text_page" => (
            format!("The text layer of page {} is nearly empty.", page),
            Severity::Review,
        ),
        other => (format!("Page {} flagged: {}", page, other), Severity::Info),
    };
    ReviewNote {
        code: flag.to_string(),
        message,
        severity,
    }
}
