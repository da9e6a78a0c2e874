// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: assemble raster images into a new document using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use printpdf::{
    Mm, Op, PdfDocument as PrintDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage,
    RawImageData, RawImageFormat, XObjectTransform,
};
use pdfmaster_core::error::{PdfMasterError, Result};
use tracing::{debug, info, instrument};

use crate::image::ImageProcessor;

/// Millimetres per inch.
const MM_PER_INCH: f32 = 25.4;

/// Title written into the /Info dictionary of assembled documents.
const DOCUMENT_TITLE: &str = "Images";

/// Creates new PDF documents with one full-bleed image per page.
pub struct PdfWriter {
    /// Resolution assumed for images: a `w`x`h` pixel image becomes a
    /// `w/dpi` x `h/dpi` inch page.
    dpi: f32,
}

impl PdfWriter {
    /// Create a writer assuming `dpi` for every image.
    pub fn new(dpi: f32) -> Self {
        Self { dpi }
    }

    /// Page size for an image, in printpdf's Mm units.
    pub fn page_size(&self, width_px: u32, height_px: u32) -> (Mm, Mm) {
        (
            Mm(width_px as f32 * MM_PER_INCH / self.dpi),
            Mm(height_px as f32 * MM_PER_INCH / self.dpi),
        )
    }

    // -- Images to PDF --------------------------------------------------------

    /// Create a PDF with one page per image, in order. Each page is exactly
    /// the image's natural size at the configured DPI. Images are converted
    /// to 8-bit RGB first.
    #[instrument(skip_all, fields(images = images.len(), dpi = self.dpi))]
    pub fn create_from_images(&self, images: Vec<ImageProcessor>) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(PdfMasterError::NotEnoughInputs {
                required: 1,
                provided: 0,
            });
        }

        info!("Creating image PDF");

        let mut doc = PrintDocument::new(DOCUMENT_TITLE);
        let mut pages = Vec::with_capacity(images.len());

        for image in images {
            let rgb = image.into_rgb().into_dynamic().to_rgb8();
            let (width, height) = rgb.dimensions();

            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // At the same DPI the image covers the page exactly.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(1.0),
                    scale_y: Some(1.0),
                    dpi: Some(self.dpi),
                    rotate: None,
                },
            }];

            let (page_w, page_h) = self.page_size(width, height);
            debug!(width, height, page_w_mm = page_w.0, page_h_mm = page_h.0, "Image placed");
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        Ok(output)
    }
}
