// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text measurement for overlays, using built-in metrics of the standard
// Type 1 fonts so no font file has to be embedded or loaded.

use tracing::warn;

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width used for codes outside the table.
const FALLBACK_WIDTH: u16 = 600;

/// Standard Type 1 fonts with built-in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    Courier,
}

impl StandardFont {
    /// Look up a font by its PostScript name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" => Some(Self::Helvetica),
            "courier" => Some(Self::Courier),
            _ => None,
        }
    }

    /// First font in `names` with built-in metrics, Helvetica if none.
    pub fn from_fallback<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .find_map(|name| Self::from_name(name.as_ref()))
            .unwrap_or_else(|| {
                if !names.is_empty() {
                    warn!("No configured font has built-in metrics, using Helvetica");
                }
                Self::Helvetica
            })
    }

    /// `/BaseFont` value.
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::Courier => "Courier",
        }
    }

    /// Ascender and descender in 1/1000 em (descender is negative).
    pub fn vertical_metrics(self) -> (f32, f32) {
        match self {
            Self::Helvetica => (718.0, -207.0),
            Self::Courier => (629.0, -157.0),
        }
    }

    fn advance(self, code: u8) -> u16 {
        match self {
            Self::Courier => 600,
            Self::Helvetica => match code {
                32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
                _ => FALLBACK_WIDTH,
            },
        }
    }
}

/// Extent of a run of text set at a given size, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    /// Distance from the baseline up to the top of the tallest glyph.
    pub ascent: f32,
    /// Distance from the baseline down to the lowest descender (positive).
    pub descent: f32,
}

impl TextExtent {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Measures strings for layout.
pub trait TextMeasurer {
    /// Font the measured text will be drawn in.
    fn font(&self) -> StandardFont;

    /// Bytes to place in the content stream for `text`.
    fn encode(&self, text: &str) -> Vec<u8>;

    /// Extent of `text` set at `size` points.
    fn measure(&self, text: &str, size: f32) -> TextExtent;
}

/// [`TextMeasurer`] backed by the standard font metric tables.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinMetrics {
    font: StandardFont,
}

impl BuiltinMetrics {
    pub fn new(font: StandardFont) -> Self {
        Self { font }
    }
}

impl TextMeasurer for BuiltinMetrics {
    fn font(&self) -> StandardFont {
        self.font
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        encode_win_ansi(text)
    }

    fn measure(&self, text: &str, size: f32) -> TextExtent {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|code| u32::from(self.font.advance(code)))
            .sum();
        let (ascender, descender) = self.font.vertical_metrics();
        TextExtent {
            width: units as f32 * size / 1000.0,
            ascent: ascender * size / 1000.0,
            descent: -descender * size / 1000.0,
        }
    }
}

/// Encode as WinAnsi for the standard fonts. Characters outside Latin-1 and
/// control characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match u32::from(ch) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        })
        .collect()
}
