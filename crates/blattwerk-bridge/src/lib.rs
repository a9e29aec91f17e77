// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — capability interfaces for the external engines the analyzer
// consumes: text recognition, orientation detection, native text layers and
// page rendering.

pub mod stub;
pub mod timeout;
pub mod traits;

use std::sync::Arc;

pub use stub::Unavailable;
pub use timeout::{TimedOrientation, TimedRecognizer, call_with_timeout};
pub use traits::*;

/// Capabilities with every collaborator absent.
///
/// Callers swap in real engines with the `with_*` builders; anything left
/// untouched degrades to its documented fallback.
pub fn unavailable_capabilities() -> Capabilities {
    Capabilities {
        recognizer: Arc::new(Unavailable),
        orientation: Arc::new(Unavailable),
        native_text: Arc::new(Unavailable),
        renderer: Arc::new(Unavailable),
    }
}
