// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page store, overlays, image recompression, and creating PDFs
// from images.

pub mod compositor;
pub mod recoder;
pub mod store;
pub mod watermark;
pub mod writer;

pub use store::PdfDocument;
pub use writer::PdfWriter;
