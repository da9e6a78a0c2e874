// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pdfmaster-document transform engine. Inputs
// are synthesised with the image-to-PDF path so the benchmarks need no
// fixture files.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use pdfmaster_core::{AppConfig, QualityBand, WatermarkPosition};
use pdfmaster_document::{DEFAULT_WATERMARK_TEXT, ImageProcessor, PdfWriter, TransformEngine};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A PDF of `pages` pages, each a 200x260 gradient image at 72 dpi.
fn synthetic_pdf(pages: usize) -> Vec<u8> {
    let images = (0..pages)
        .map(|n| {
            let img = RgbImage::from_fn(200, 260, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, (n * 40 % 256) as u8])
            });
            ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img))
        })
        .collect();
    PdfWriter::new(72.0)
        .create_from_images(images)
        .expect("synthetic PDF")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Combine two 10-page documents. Exercises page import with shared
/// resource memoisation.
fn bench_combine(c: &mut Criterion) {
    let engine = TransformEngine::new(AppConfig::default());
    let inputs = vec![synthetic_pdf(10), synthetic_pdf(10)];

    c.bench_function("combine (2 x 10 pages)", |b| {
        b.iter(|| black_box(engine.combine(black_box(&inputs)).expect("combine")));
    });
}

/// Split a 20-page document into four parts.
fn bench_partition(c: &mut Criterion) {
    let engine = TransformEngine::new(AppConfig::default());
    let input = synthetic_pdf(20);

    c.bench_function("partition (20 pages, 4 ranges)", |b| {
        b.iter(|| {
            black_box(
                engine
                    .partition(black_box(&input), Some("1-5,6-10,11-15,16-20"))
                    .expect("partition"),
            )
        });
    });
}

/// Re-encode every embedded image at the low quality band.
fn bench_recompress(c: &mut Criterion) {
    let engine = TransformEngine::new(AppConfig::default());
    let input = synthetic_pdf(5);

    c.bench_function("recompress (5 images, low)", |b| {
        b.iter(|| black_box(engine.recompress(black_box(&input), QualityBand::Low).expect("recompress")));
    });
}

/// Stamp the default text on every page of a 10-page document.
fn bench_watermark(c: &mut Criterion) {
    let engine = TransformEngine::new(AppConfig::default());
    let input = synthetic_pdf(10);

    c.bench_function("watermark (10 pages, center)", |b| {
        b.iter(|| {
            black_box(
                engine
                    .watermark(black_box(&input), DEFAULT_WATERMARK_TEXT, WatermarkPosition::Center)
                    .expect("watermark"),
            )
        });
    });
}

criterion_group!(benches, bench_combine, bench_partition, bench_recompress, bench_watermark);
criterion_main!(benches);
