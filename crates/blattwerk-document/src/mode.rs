// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page mode decision: native text layer, recognition, or both.

use blattwerk_core::config::ModeHint;
use blattwerk_core::geometry::round_to;

const NATIVE_BASE: f64 = 55.0;
const NATIVE_CAP: f64 = 96.0;

/// Heuristic confidence (0-100) of a native text layer from its volume.
pub fn native_confidence(blocks: usize, words: usize, chars: usize) -> f64 {
    if chars == 0 {
        return 0.0;
    }
    let block_factor = blocks.min(8) as f64 / 8.0;
    let word_factor = (words as f64 / 120.0).min(1.0);
    let char_factor = (chars as f64 / 1500.0).min(1.0);
    let conf = NATIVE_BASE + block_factor * 20.0 + word_factor * 15.0 + char_factor * 10.0;
    round_to(conf.min(NATIVE_CAP), 2)
}

/// Whether a `mixed` page can rely on native text alone.
///
/// `image_coverage` is the share of the page covered by images.
pub fn use_native_mixed(conf: f64, blocks: usize, words: usize, image_coverage: f64, blocks_threshold: usize) -> bool {
    if conf <= 0.0 || words == 0 {
        return false;
    }
    (blocks >= blocks_threshold && conf >= 75.0 && image_coverage < 0.6) || (conf >= 85.0 && words > 40)
}

/// What to run for a page and the recorded decision string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDecision {
    pub decision: &'static str,
    pub use_native: bool,
    pub run_recognition: bool,
}

impl ModeDecision {
    const NATIVE: Self = Self {
        decision: "native",
        use_native: true,
        run_recognition: false,
    };
    const OCR: Self = Self {
        decision: "ocr",
        use_native: false,
        run_recognition: true,
    };
    const BOTH: Self = Self {
        decision: "native+ocr",
        use_native: true,
        run_recognition: true,
    };
}

/// Volume of a page's native text layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NativeVolume {
    pub blocks: usize,
    pub words: usize,
    pub chars: usize,
}

impl NativeVolume {
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub fn confidence(&self) -> f64 {
        native_confidence(self.blocks, self.words, self.chars)
    }
}

/// Decide the mode of one page.
pub fn decide(hint: ModeHint, native: NativeVolume, image_coverage: f64, blocks_threshold: usize) -> ModeDecision {
    if native.is_empty() {
        return ModeDecision::OCR;
    }
    match hint {
        ModeHint::Text => ModeDecision::NATIVE,
        ModeHint::Ocr => ModeDecision::OCR,
        ModeHint::Mixed | ModeHint::Auto => {
            let conf = native.confidence();
            if use_native_mixed(conf, native.blocks, native.words, image_coverage, blocks_threshold) {
                ModeDecision::NATIVE
            } else {
                ModeDecision::BOTH
            }
        }
    }
}

/// Pick between native and recognized text for a `native+ocr` page.
///
/// The clearly longer text wins; comparable lengths keep the native text
/// with a blended confidence.
pub fn merge_text(native: &str, native_conf: f64, ocr: &str, ocr_conf: f64) -> (String, f64) {
    if native.trim().is_empty() {
        return (ocr.to_string(), ocr_conf);
    }
    if ocr.trim().is_empty() {
        return (native.to_string(), native_conf);
    }
    let (len_native, len_ocr) = (native.chars().count() as f64, ocr.chars().count() as f64);
    if len_ocr > len_native * 1.25 {
        return (ocr.to_string(), ocr_conf.max(native_conf));
    }
    if len_native > len_ocr * 1.25 {
        return (native.to_string(), native_conf.max(ocr_conf));
    }
    let blended = native_conf.max(ocr_conf).max((native_conf + ocr_conf) / 2.0).min(99.0);
    (native.to_string(), round_to(blended, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_saturates_at_cap() {
        assert_eq!(native_confidence(0, 0, 0), 0.0);
        assert_eq!(native_confidence(8, 120, 1500), 96.0);
        assert_eq!(native_confidence(4, 60, 750), 77.5);
    }

    #[test]
    fn mixed_prefers_native_for_rich_pages() {
        assert!(use_native_mixed(80.0, 3, 20, 0.1, 3));
        assert!(!use_native_mixed(80.0, 3, 20, 0.7, 3));
        assert!(use_native_mixed(90.0, 1, 41, 0.9, 3));
        assert!(!use_native_mixed(90.0, 1, 0, 0.0, 3));
    }

    #[test]
    fn decisions_follow_hint() {
        let rich = NativeVolume {
            blocks: 8,
            words: 200,
            chars: 2000,
        };
        let thin = NativeVolume {
            blocks: 1,
            words: 5,
            chars: 30,
        };
        assert_eq!(decide(ModeHint::Mixed, rich, 0.0, 3).decision, "native");
        assert_eq!(decide(ModeHint::Auto, thin, 0.0, 3).decision, "native+ocr");
        assert_eq!(decide(ModeHint::Ocr, rich, 0.0, 3).decision, "ocr");
        assert_eq!(decide(ModeHint::Text, thin, 0.0, 3).decision, "native");
        assert_eq!(decide(ModeHint::Text, NativeVolume::default(), 0.0, 3).decision, "ocr");
    }

    #[test]
    fn merge_keeps_longer_text() {
        assert_eq!(merge_text("", 0.0, "Befund", 80.0), ("Befund".to_string(), 80.0));
        assert_eq!(merge_text("Befund", 70.0, "", 0.0), ("Befund".to_string(), 70.0));
        let (text, conf) = merge_text("ab", 70.0, "abcdefgh", 60.0);
        assert_eq!((text.as_str(), conf), ("abcdefgh", 70.0));
        let (text, conf) = merge_text("Befund", 70.0, "Befunt", 90.0);
        assert_eq!((text.as_str(), conf), ("Befund", 90.0));
    }
}
