// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfmaster-document: Document transformations for PDFMaster.
//
// Provides the page store (parse, copy pages between documents, decrypt,
// serialize), the overlay compositor, embedded-image recompression, page
// rasterization, image-to-PDF assembly, and the transform engine that ties
// them into the seven user-facing operations.

pub mod engine;
pub mod image;
pub mod pdf;
pub mod ranges;
pub mod raster;
pub mod text;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

// Re-export the primary structs so callers can use `pdfmaster_document::TransformEngine` etc.
pub use engine::{DEFAULT_WATERMARK_TEXT, TransformEngine, TransformOutput, TransformRequest};
pub use image::ImageProcessor;
pub use pdf::store::{Page, PasswordState, PdfDocument, SaveOptions};
pub use pdf::writer::PdfWriter;
pub use ranges::{PageSpan, parse_ranges};
pub use raster::{PageRasterizer, PdfiumRasterizer};
