// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the blattwerk-document hot paths: skew estimation,
// table-grid detection and block reconstruction on synthetic pages.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use blattwerk_core::config::Sensitivity;
use blattwerk_core::geometry::PageSize;
use blattwerk_core::types::{RawBlock, SourceMode};
use blattwerk_document::layout::{LayoutParams, build_blocks};
use blattwerk_document::normalize::skew::estimate_page_skew;
use blattwerk_document::tables::scan_grid;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 600x800 white page with 20 horizontal text-like bars.
fn text_lines_page() -> GrayImage {
    let mut img = GrayImage::from_pixel(600, 800, Luma([255u8]));
    for row in 0..20 {
        draw_filled_rect_mut(&mut img, Rect::at(60, 60 + row * 35).of_size(480, 4), Luma([0u8]));
    }
    img
}

/// 800x600 page with a 6x4 ruled grid.
fn ruled_page() -> DynamicImage {
    let mut img = GrayImage::from_pixel(800, 600, Luma([255u8]));
    for y in (50..=550).step_by(100) {
        draw_filled_rect_mut(&mut img, Rect::at(50, y).of_size(701, 2), Luma([0u8]));
    }
    for x in (50..=750).step_by(175) {
        draw_filled_rect_mut(&mut img, Rect::at(x, 50).of_size(2, 501), Luma([0u8]));
    }
    DynamicImage::ImageLuma8(img)
}

fn raw_blocks(count: usize) -> Vec<RawBlock> {
    (0..count)
        .map(|i| {
            let top = 40.0 + i as f64 * 18.0;
            RawBlock {
                text: format!("{}. Befund und Beurteilung der Untersuchung Nummer {}", i + 1, i),
                bbox: vec![50.0, top, 545.0, top + 14.0],
                font_size: Some(if i % 10 == 0 { 16.0 } else { 10.0 }),
                ..RawBlock::default()
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_skew(c: &mut Criterion) {
    let page = text_lines_page();
    c.bench_function("estimate_page_skew (600x800)", |b| {
        b.iter(|| black_box(estimate_page_skew(black_box(&page))));
    });
}

fn bench_grid(c: &mut Criterion) {
    let page = ruled_page();
    c.bench_function("scan_grid detect (800x600)", |b| {
        b.iter(|| black_box(scan_grid(black_box(&page), Sensitivity::Normal, false, None, "deu")));
    });
}

fn bench_blocks(c: &mut Criterion) {
    let blocks = raw_blocks(40);
    let size = PageSize { width: 595.0, height: 842.0 };
    let params = LayoutParams::default();
    c.bench_function("build_blocks (40 blocks)", |b| {
        b.iter(|| black_box(build_blocks(1, &size, black_box(&blocks), SourceMode::Text, &params)));
    });
}

criterion_group!(benches, bench_skew, bench_grid, bench_blocks);
criterion_main!(benches);
