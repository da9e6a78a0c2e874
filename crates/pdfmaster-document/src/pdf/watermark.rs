// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark stamping: per-page text layout and overlay construction on top
// of the page compositor.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use pdfmaster_core::config::WatermarkConfig;
use pdfmaster_core::error::{PdfMasterError, Result};
use pdfmaster_core::types::{WatermarkPosition, ZOrder};
use tracing::{debug, instrument};

use super::compositor::{Overlay, composite};
use super::store::{Page, PdfDocument};
use crate::text::TextMeasurer;

/// Resource names the overlay asks for. The compositor renames them if the
/// page already uses them for something else.
const FONT_NAME: &str = "F1";
const STATE_NAME: &str = "GS1";

/// Where the text goes on one page, in user-space points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub font_size: f32,
    /// Start of the baseline.
    pub origin: (f32, f32),
    /// `[llx, lly, urx, ury]` of the text box (advance width by
    /// ascender-to-descender height).
    pub bbox: [f32; 4],
}

impl TextPlacement {
    pub fn center(&self) -> (f32, f32) {
        (
            (self.bbox[0] + self.bbox[2]) / 2.0,
            (self.bbox[1] + self.bbox[3]) / 2.0,
        )
    }
}

/// Lay out `text` on `page`. Computed per page because page sizes may differ
/// within one document.
pub fn place_text(
    page: &Page,
    text: &str,
    position: WatermarkPosition,
    measurer: &dyn TextMeasurer,
    config: &WatermarkConfig,
) -> TextPlacement {
    let font_size = (page.width().min(page.height()) / config.font_size_divisor)
        .max(config.min_font_size);
    let extent = measurer.measure(text, font_size);
    let (x0, y0) = page.origin();
    let margin = config.margin;

    // Bottom-left of the text box relative to the page origin.
    let (left, bottom) = match position {
        WatermarkPosition::TopLeft => (margin, page.height() - margin - extent.height()),
        WatermarkPosition::TopRight => (
            page.width() - margin - extent.width,
            page.height() - margin - extent.height(),
        ),
        WatermarkPosition::Center => (
            (page.width() - extent.width) / 2.0,
            (page.height() - extent.height()) / 2.0,
        ),
    };

    let llx = x0 + left;
    let lly = y0 + bottom;
    TextPlacement {
        font_size,
        origin: (llx, lly + extent.descent),
        bbox: [llx, lly, llx + extent.width, lly + extent.height()],
    }
}

/// Stamps the same text on every page of one document.
pub struct Watermarker<'a> {
    measurer: &'a dyn TextMeasurer,
    config: &'a WatermarkConfig,
    /// Font and graphics-state objects shared by every page's overlay.
    font_id: ObjectId,
    state_id: ObjectId,
}

impl<'a> Watermarker<'a> {
    /// Add the shared font and transparency objects to `document`.
    pub fn new(
        document: &mut PdfDocument,
        measurer: &'a dyn TextMeasurer,
        config: &'a WatermarkConfig,
    ) -> Self {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set(
            "BaseFont",
            Object::Name(measurer.font().base_font().as_bytes().to_vec()),
        );
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let font_id = document.add_object(font);

        let mut state = Dictionary::new();
        state.set("Type", Object::Name(b"ExtGState".to_vec()));
        state.set("ca", Object::Real(config.opacity));
        state.set("CA", Object::Real(config.opacity));
        let state_id = document.add_object(state);

        Self {
            measurer,
            config,
            font_id,
            state_id,
        }
    }

    /// Stamp `text` onto `page` above its content.
    #[instrument(skip(self, document, text), fields(page = page.index))]
    pub fn stamp(
        &self,
        document: &mut PdfDocument,
        page: &Page,
        text: &str,
        position: WatermarkPosition,
    ) -> Result<TextPlacement> {
        let placement = place_text(page, text, position, self.measurer, self.config);
        let overlay = self.overlay(text, &placement).map_err(|reason| {
            PdfMasterError::CompositeFailed {
                page: page.index + 1,
                reason,
            }
        })?;
        composite(document, page, &overlay, ZOrder::Above)?;
        debug!(
            font_size = placement.font_size,
            x = placement.origin.0,
            y = placement.origin.1,
            "Watermark placed"
        );
        Ok(placement)
    }

    fn overlay(&self, text: &str, placement: &TextPlacement) -> std::result::Result<Overlay, String> {
        let [r, g, b] = self.config.color;
        let (x, y) = placement.origin;
        let content = Content {
            operations: vec![
                Operation::new("gs", vec![Object::Name(STATE_NAME.as_bytes().to_vec())]),
                Operation::new("rg", vec![r.into(), g.into(), b.into()]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(FONT_NAME.as_bytes().to_vec()),
                        placement.font_size.into(),
                    ],
                ),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        self.measurer.encode(text),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content = content.encode().map_err(|err| err.to_string())?;

        let mut fonts = Dictionary::new();
        fonts.set(FONT_NAME, Object::Reference(self.font_id));
        let mut states = Dictionary::new();
        states.set(STATE_NAME, Object::Reference(self.state_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("ExtGState", Object::Dictionary(states));

        Ok(Overlay { content, resources })
    }
}
