// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// German/English language heuristics: keyword scoring, locale hints from
// number and date formats, block language resolution and per-page shares.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use blattwerk_core::geometry::round_to;
use blattwerk_core::types::{BlockLang, Lang, LangHint, TextBlock};
use regex::Regex;

const DE_KEYWORDS: &[&str] = &[
    "und", "der", "die", "das", "ein", "eine", "ist", "nicht", "mit", "fuer", "aus", "dem", "den",
    "des", "bei", "oder", "wir", "sie", "dass", "zum", "zur", "ueber",
];

/// ASCII substitutes for umlauts and sharp s.
const DE_DIGRAPHS: &[&str] = &["ue", "oe", "ae", "ss"];

const EN_KEYWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "your", "you", "please", "dear", "hello",
    "thank", "invoice", "date", "page", "tax",
];

const DE_MONTHS: &[&str] = &[
    "januar", "februar", "maerz", "april", "mai", "juni", "juli", "august", "september", "oktober",
    "november", "dezember",
];

const EN_MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ]").expect("valid regex"));
static DE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{2,4}\b").expect("valid regex"));
static EN_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("valid regex"));
static DE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,3}(?:\.\d{3})*,\d{2}\b").expect("valid regex"));
static EN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,3}(?:,\d{3})*\.\d{2}\b").expect("valid regex"));

/// Keyword scores `(de, en)` for a text.
pub fn language_scores(text: &str) -> (u32, u32) {
    let normalized = NON_WORD.replace_all(text, " ").to_lowercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut de = tokens
        .iter()
        .filter(|tok| DE_KEYWORDS.contains(*tok) || DE_DIGRAPHS.iter().any(|d| tok.contains(*d)))
        .count() as u32;
    let mut en = tokens.iter().filter(|tok| EN_KEYWORDS.contains(*tok)).count() as u32;
    if tokens.iter().any(|tok| DE_MONTHS.contains(tok)) {
        de += 1;
    }
    if tokens.iter().any(|tok| EN_MONTHS.contains(tok)) {
        en += 1;
    }
    (de, en)
}

/// Coarse language of a text.
pub fn language_hint(text: &str) -> LangHint {
    let (de, en) = language_scores(text);
    match (de, en) {
        (0, 0) => LangHint::Unknown,
        (d, e) if d > 0 && e > 0 && d.abs_diff(e) <= 1 => LangHint::Mixed,
        (d, e) if d > e => LangHint::De,
        _ => LangHint::En,
    }
}

/// Locale from number and date formats.
pub fn locale_hint(text: &str) -> LangHint {
    let has_de = DE_DATE.is_match(text) || DE_NUMBER.is_match(text);
    let has_en = EN_DATE.is_match(text) || EN_NUMBER.is_match(text);
    locale_of(has_de, has_en)
}

/// Separate `(numbers, dates)` locale hints.
pub fn number_and_date_locales(text: &str) -> (LangHint, LangHint) {
    (
        locale_of(DE_NUMBER.is_match(text), EN_NUMBER.is_match(text)),
        locale_of(DE_DATE.is_match(text), EN_DATE.is_match(text)),
    )
}

fn locale_of(has_de: bool, has_en: bool) -> LangHint {
    match (has_de, has_en) {
        (true, true) => LangHint::Mixed,
        (true, false) => LangHint::De,
        (false, true) => LangHint::En,
        (false, false) => LangHint::Unknown,
    }
}

/// Languages named by a free-form label (`deu+eng`, `mixed`, `ger`, ...).
pub fn parse_lang_tokens(label: &str) -> Vec<Lang> {
    let mut langs = Vec::new();
    for token in label.split(['+', ',', ' ', '_', '/']) {
        let found: &[Lang] = match token.trim().to_ascii_lowercase().as_str() {
            "de" | "ger" | "deu" | "german" => &[Lang::De],
            "en" | "eng" | "english" => &[Lang::En],
            "mixed" => &[Lang::De, Lang::En],
            _ => &[],
        };
        for lang in found {
            if !langs.contains(lang) {
                langs.push(*lang);
            }
        }
    }
    langs.sort();
    langs
}

/// Resolve a block's language: explicit label, then hint, then text
/// heuristic, then German.
pub fn resolve_block_lang(lang: Option<&str>, hint: Option<&str>, text: &str) -> BlockLang {
    let labelled = [lang, hint]
        .into_iter()
        .flatten()
        .map(parse_lang_tokens)
        .find(|langs| !langs.is_empty());
    let langs = labelled.unwrap_or_else(|| match language_hint(text) {
        LangHint::De => vec![Lang::De],
        LangHint::En => vec![Lang::En],
        LangHint::Mixed => vec![Lang::De, Lang::En],
        LangHint::Unknown => Vec::new(),
    });
    BlockLang::from_langs(langs.contains(&Lang::De), langs.contains(&Lang::En)).unwrap_or(BlockLang::De)
}

pub fn lang_confidence(lang: BlockLang, text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    match lang {
        BlockLang::DeEn => 0.7,
        _ => 0.95,
    }
}

/// Character-weighted language share over blocks. Empty when no block has
/// any characters.
pub fn lang_share(blocks: &[TextBlock]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<&'static str, f64> = BTreeMap::new();
    let mut sum = 0.0;
    for block in blocks {
        let chars = block.char_count as f64;
        if chars <= 0.0 {
            continue;
        }
        let langs = block.lang.langs();
        let weight = chars / langs.len() as f64;
        for lang in langs {
            *totals.entry(lang.code()).or_insert(0.0) += weight;
        }
        sum += chars;
    }
    if sum <= 0.0 {
        return BTreeMap::new();
    }
    totals
        .into_iter()
        .map(|(code, value)| (code.to_string(), round_to(value / sum, 4)))
        .collect()
}

/// Collapse a share into one label; dominant above 0.8 with the other
/// below 0.2, otherwise both.
pub fn collapse_share(share: &BTreeMap<String, f64>) -> Option<BlockLang> {
    if share.is_empty() {
        return None;
    }
    let de = share.get("de").copied().unwrap_or(0.0);
    let en = share.get("en").copied().unwrap_or(0.0);
    if de > 0.8 && en < 0.2 {
        Some(BlockLang::De)
    } else if en > 0.8 && de < 0.2 {
        Some(BlockLang::En)
    } else {
        Some(BlockLang::DeEn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn german_keywords_and_digraphs() {
        assert_eq!(language_hint("Die Rechnung ist fuer den Monat Maerz"), LangHint::De);
        assert_eq!(language_scores("Strasse"), (1, 0));
    }

    #[test]
    fn english_keywords() {
        assert_eq!(language_hint("Please find the invoice for this month"), LangHint::En);
    }

    #[test]
    fn close_scores_are_mixed() {
        assert_eq!(language_hint("Die Rechnung / the invoice"), LangHint::Mixed);
        assert_eq!(language_hint("12345 67890"), LangHint::Unknown);
        assert_eq!(language_hint(""), LangHint::Unknown);
    }

    #[test]
    fn locale_from_formats() {
        assert_eq!(locale_hint("Betrag 1.234,56 am 3.4.2024"), LangHint::De);
        assert_eq!(locale_hint("Total 1,234.56 due 4/3/2024"), LangHint::En);
        assert_eq!(locale_hint("1.234,56 and 1,234.56"), LangHint::Mixed);
        assert_eq!(locale_hint("nothing here"), LangHint::Unknown);
        assert_eq!(number_and_date_locales("12,50 on 4/3/24"), (LangHint::De, LangHint::En));
    }

    #[test]
    fn lang_labels_normalise() {
        assert_eq!(parse_lang_tokens("deu+eng"), vec![Lang::De, Lang::En]);
        assert_eq!(parse_lang_tokens("GER"), vec![Lang::De]);
        assert_eq!(parse_lang_tokens("mixed"), vec![Lang::De, Lang::En]);
        assert!(parse_lang_tokens("fra").is_empty());
    }

    #[test]
    fn block_lang_resolution_order() {
        assert_eq!(resolve_block_lang(Some("en"), Some("de"), "und der die"), BlockLang::En);
        assert_eq!(resolve_block_lang(Some("xx"), Some("de"), "the"), BlockLang::De);
        assert_eq!(resolve_block_lang(None, None, "the invoice for you"), BlockLang::En);
        assert_eq!(resolve_block_lang(None, None, "42"), BlockLang::De);
        assert_eq!(resolve_block_lang(Some("de+en"), None, ""), BlockLang::DeEn);
    }

    #[test]
    fn share_collapse_thresholds() {
        let share = |de: f64, en: f64| BTreeMap::from([("de".to_string(), de), ("en".to_string(), en)]);
        assert_eq!(collapse_share(&share(0.9, 0.1)), Some(BlockLang::De));
        assert_eq!(collapse_share(&share(0.1, 0.9)), Some(BlockLang::En));
        assert_eq!(collapse_share(&share(0.5, 0.5)), Some(BlockLang::DeEn));
        assert_eq!(collapse_share(&BTreeMap::new()), None);
    }

    #[test]
    fn confidence_by_label() {
        assert_eq!(lang_confidence(BlockLang::De, "Hallo"), 0.95);
        assert_eq!(lang_confidence(BlockLang::DeEn, "Hallo"), 0.7);
        assert_eq!(lang_confidence(BlockLang::En, "  "), 0.0);
    }
}
