// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.
//
// Page-level code converts these into status-tagged records and warning
// codes; only configuration and I/O problems reach the caller of a run.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Input errors --
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    // -- Page processing errors --
    #[error("image processing failed: {0}")]
    Image(String),

    #[error("page render failed: {0}")]
    Render(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Recognition engine --
    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("recognition timed out after {0} ms")]
    Timeout(u64),

    #[error("capability unavailable: {0}")]
    EngineUnavailable(String),

    // -- Run control --
    #[error("analysis cancelled")]
    Cancelled,

    // -- Persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Short, stable kind label used inside warning codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidGeometry(_) => "geometry",
            Self::Config(_) => "config",
            Self::UnsupportedDocument(_) => "unsupported",
            Self::Image(_) => "image",
            Self::Render(_) => "render",
            Self::Pdf(_) => "pdf",
            Self::Recognition(_) => "recognition",
            Self::Timeout(_) => "timeout",
            Self::EngineUnavailable(_) => "unavailable",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
