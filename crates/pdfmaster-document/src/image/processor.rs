// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode uploads and embedded samples, normalise colour,
// and encode to PNG/JPEG. Operates on in-memory images using the `image`
// crate.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use pdfmaster_core::error::{PdfMasterError, Result};
use tracing::{debug, instrument};

/// Colour model of raw, unfiltered image samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    Gray,
    Rgb,
    Cmyk,
}

impl SampleLayout {
    /// Bytes per pixel at 8 bits per component.
    pub fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }
}

/// A single in-memory raster image.
///
/// Consuming methods return a new `ImageProcessor` so conversions chain:
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&upload)?
///     .into_rgb()
///     .to_jpeg_bytes(40)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode encoded bytes (JPEG, PNG, etc.), sniffing the format.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| PdfMasterError::ImageError(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Decode a baseline or progressive JPEG.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|err| PdfMasterError::ImageError(format!("failed to decode JPEG: {err}")))?;
        Ok(Self { image: img })
    }

    /// Build an image from raw 8-bit samples. Trailing bytes beyond
    /// `width * height * channels` are ignored; CMYK is converted to RGB.
    pub fn from_samples(width: u32, height: u32, layout: SampleLayout, data: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * layout.channels();
        if width == 0 || height == 0 || data.len() < expected {
            return Err(PdfMasterError::ImageError(format!(
                "{layout:?} samples for {width}x{height}: expected {expected} bytes, got {}",
                data.len()
            )));
        }
        let samples = &data[..expected];

        let image = match layout {
            SampleLayout::Gray => GrayImage::from_raw(width, height, samples.to_vec())
                .map(DynamicImage::ImageLuma8),
            SampleLayout::Rgb => {
                RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8)
            }
            SampleLayout::Cmyk => {
                let rgb = samples
                    .chunks_exact(4)
                    .flat_map(|px| {
                        let k = 1.0 - px[3] as f32 / 255.0;
                        [px[0], px[1], px[2]].map(|c| ((1.0 - c as f32 / 255.0) * k * 255.0) as u8)
                    })
                    .collect();
                RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
            }
        };

        image
            .map(|image| Self { image })
            .ok_or_else(|| PdfMasterError::ImageError("sample buffer size mismatch".into()))
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the image carries a single luma channel.
    pub fn is_grayscale(&self) -> bool {
        matches!(
            self.image,
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_)
        )
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Conversions ----------------------------------------------------------

    /// Drop alpha and palette information, leaving 8-bit RGB.
    pub fn into_rgb(self) -> Self {
        match self.image {
            DynamicImage::ImageRgb8(_) => self,
            other => Self {
                image: DynamicImage::ImageRgb8(other.to_rgb8()),
            },
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode as JPEG with the given quality (1-100). Grayscale images stay
    /// single-channel; everything else is written as RGB.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        let written = if self.is_grayscale() {
            self.image.to_luma8().write_with_encoder(encoder)
        } else {
            self.image.to_rgb8().write_with_encoder(encoder)
        };
        written
            .map_err(|err| PdfMasterError::ImageError(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| PdfMasterError::ImageError(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 7, image::Rgb([10, 200, 30])));
        let png = ImageProcessor::from_dynamic(img).to_png_bytes().unwrap();
        let back = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!((back.width(), back.height()), (12, 7));
    }

    #[test]
    fn rgba_is_flattened_to_rgb() {
        let rgba = image::RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]));
        let processor = ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(rgba)).into_rgb();
        assert!(matches!(processor.as_dynamic(), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn raw_samples_are_validated() {
        assert!(ImageProcessor::from_samples(2, 2, SampleLayout::Rgb, &[0; 11]).is_err());
        let gray = ImageProcessor::from_samples(2, 2, SampleLayout::Gray, &[7; 4]).unwrap();
        assert!(gray.is_grayscale());
    }

    #[test]
    fn cmyk_converts_to_rgb() {
        // Pure cyan: C=255, others 0.
        let cmyk = ImageProcessor::from_samples(1, 1, SampleLayout::Cmyk, &[255, 0, 0, 0]).unwrap();
        let rgb = cmyk.into_dynamic().to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 255, 255]);
    }

    #[test]
    fn jpeg_quality_affects_size() {
        let noisy = RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) * 5 % 256) as u8])
        });
        let processor = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(noisy));
        let small = processor.to_jpeg_bytes(10).unwrap();
        let large = processor.to_jpeg_bytes(95).unwrap();
        assert!(small.len() < large.len());
        assert!(ImageProcessor::from_jpeg(&small).is_ok());
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = ImageProcessor::from_bytes(b"nope").err().unwrap();
        assert!(matches!(err, PdfMasterError::ImageError(_)));
    }
}
