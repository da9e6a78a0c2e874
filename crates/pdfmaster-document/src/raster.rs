// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterizer capability. The production implementation binds the PDFium
// shared library at runtime through `pdfium-render`.

use std::path::PathBuf;

use pdfium_render::prelude::*;
use pdfmaster_core::config::RasterConfig;
use pdfmaster_core::error::{PdfMasterError, Result};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;

/// Name used in [`PdfMasterError::CapabilityUnavailable`].
pub const RASTERIZER_CAPABILITY: &str = "page rasterizer";

/// Renders document pages to pixel buffers.
pub trait PageRasterizer: Send + Sync {
    /// Render every page of `pdf`, in order, at `scale` pixels per point.
    ///
    /// A page that fails to render fails the whole call with
    /// [`PdfMasterError::RenderFailed`].
    fn render_pages(&self, pdf: &[u8], scale: f32) -> Result<Vec<ImageProcessor>>;
}

/// [`PageRasterizer`] backed by PDFium.
///
/// PDFium is not thread-safe, so each call binds its own instance.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind PDFium once to prove it is loadable. Failure is
    /// [`PdfMasterError::CapabilityUnavailable`].
    pub fn probe(config: &RasterConfig) -> Result<Self> {
        let rasterizer = Self {
            library_dir: config.pdfium_library_dir.clone(),
        };
        rasterizer.bind()?;
        info!(library_dir = ?rasterizer.library_dir, "PDFium bound");
        Ok(rasterizer)
    }

    fn bind(&self) -> Result<Pdfium> {
        let configured = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
        };
        let bindings = configured
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|err| PdfMasterError::CapabilityUnavailable {
                capability: RASTERIZER_CAPABILITY,
                reason: format!("failed to load PDFium: {err}"),
            })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    #[instrument(skip_all, fields(bytes_len = pdf.len(), scale))]
    fn render_pages(&self, pdf: &[u8], scale: f32) -> Result<Vec<ImageProcessor>> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|err| match err {
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                    PdfMasterError::Encrypted
                }
                other => PdfMasterError::MalformedDocument(other.to_string()),
            })?;

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .render_form_data(true)
            .render_annotations(true);

        let mut rendered = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page.render_with_config(&config).map_err(|err| {
                warn!(page = index + 1, %err, "Page render failed");
                PdfMasterError::RenderFailed {
                    page: index + 1,
                    reason: err.to_string(),
                }
            })?;
            let image = ImageProcessor::from_dynamic(bitmap.as_image());
            debug!(
                page = index + 1,
                width = image.width(),
                height = image.height(),
                "Page rendered"
            );
            rendered.push(image);
        }
        Ok(rendered)
    }
}
