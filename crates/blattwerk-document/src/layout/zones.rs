// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page zones (header band, body, footer band) and word boxes in document
// space.

use blattwerk_core::geometry::{BBox, PageSize};
use blattwerk_core::types::{RawBlock, RawWord, TextBlock, Word, Zone, ZoneKind};
use tracing::debug;

use super::blocks::block_id;

/// Whether a block (document space) touches the top or bottom band.
pub fn header_footer_hits(bbox: &BBox, page_height: f64, margin: f64) -> (bool, bool) {
    let band = page_height * margin;
    (bbox.y1 >= page_height - band, bbox.y0 <= band)
}

/// Header, body and footer zones for one page.
pub fn page_zones(page: u32, size: &PageSize, blocks: &[TextBlock], margin: f64) -> Vec<Zone> {
    let mut header: Option<BBox> = None;
    let mut footer: Option<BBox> = None;
    for block in blocks.iter().filter(|b| b.page == page) {
        let (top, bottom) = header_footer_hits(&block.bbox, size.height, margin);
        if top {
            header = Some(header.map_or(block.bbox, |h| h.union(&block.bbox)));
        } else if bottom {
            footer = Some(footer.map_or(block.bbox, |f| f.union(&block.bbox)));
        }
    }

    let mut zones = Vec::new();
    let body_top = header.map_or(size.height, |h| h.y0);
    let body_bottom = footer.map_or(0.0, |f| f.y1);
    if let Some(bbox) = header {
        zones.push(Zone {
            page,
            kind: ZoneKind::Header,
            bbox,
        });
    }
    if let Ok(bbox) = BBox::new(0.0, body_bottom, size.width, body_top) {
        zones.push(Zone {
            page,
            kind: ZoneKind::Body,
            bbox,
        });
    }
    if let Some(bbox) = footer {
        zones.push(Zone {
            page,
            kind: ZoneKind::Footer,
            bbox,
        });
    }
    zones
}

/// Word boxes flipped to document space. Words whose box equals their
/// block's box add nothing and are dropped, as are words without a usable
/// box.
pub fn page_words(page: u32, size: &PageSize, raw_words: &[RawWord], raw_blocks: &[RawBlock]) -> Vec<Word> {
    let mut words = Vec::with_capacity(raw_words.len());
    for raw in raw_words {
        let Ok(bbox) = BBox::from_slice(&raw.bbox) else {
            continue;
        };
        let owner = raw.block.and_then(|i| raw_blocks.get(i).map(|b| (i, b)));
        if let Some((_, block)) = owner
            && BBox::from_slice(&block.bbox).is_ok_and(|b| b == bbox)
        {
            continue;
        }
        words.push(Word {
            page,
            text: raw.text.clone(),
            bbox: bbox.flip_vertical(size.height).rounded(3),
            conf: raw.conf,
            block_id: owner.map(|(i, b)| block_id(page, i, b)),
        });
    }
    debug!(page, words = words.len(), dropped = raw_words.len() - words.len(), "Words collected");
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::SourceMode;

    use crate::layout::blocks::{LayoutParams, build_blocks};

    fn page() -> PageSize {
        PageSize::new(600.0, 1000.0).unwrap()
    }

    fn raw(text: &str, bbox: [f64; 4]) -> RawBlock {
        RawBlock {
            text: text.into(),
            bbox: bbox.to_vec(),
            ..RawBlock::default()
        }
    }

    #[test]
    fn zones_split_page() {
        let raws = vec![
            raw("Praxis", [40.0, 20.0, 200.0, 60.0]),
            raw("Befund", [40.0, 300.0, 500.0, 600.0]),
            raw("Seite 1", [250.0, 950.0, 350.0, 980.0]),
        ];
        let blocks = build_blocks(1, &page(), &raws, SourceMode::Text, &LayoutParams::default()).blocks;
        let zones = page_zones(1, &page(), &blocks, 0.12);
        let kinds: Vec<ZoneKind> = zones.iter().map(|z| z.kind).collect();
        assert_eq!(kinds, vec![ZoneKind::Header, ZoneKind::Body, ZoneKind::Footer]);
        assert_eq!(zones[1].bbox.to_array(), [0.0, 50.0, 600.0, 940.0]);
    }

    #[test]
    fn page_without_bands_is_all_body() {
        let zones = page_zones(1, &page(), &[], 0.12);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].bbox, page().bbox());
    }

    #[test]
    fn redundant_word_boxes_are_dropped() {
        let blocks = vec![raw("Hallo", [10.0, 10.0, 60.0, 30.0]), raw("Welt Test", [10.0, 40.0, 120.0, 60.0])];
        let words = vec![
            RawWord {
                text: "Hallo".into(),
                bbox: vec![10.0, 10.0, 60.0, 30.0],
                conf: Some(91.0),
                block: Some(0),
            },
            RawWord {
                text: "Welt".into(),
                bbox: vec![10.0, 40.0, 50.0, 60.0],
                conf: None,
                block: Some(1),
            },
            RawWord {
                text: "kaputt".into(),
                bbox: vec![],
                conf: None,
                block: None,
            },
        ];
        let out = page_words(3, &page(), &words, &blocks);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Welt");
        assert_eq!(out[0].bbox.to_array(), [10.0, 940.0, 50.0, 960.0]);
        assert_eq!(out[0].block_id.as_deref(), Some("p3-b001"));
    }
}
