// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform engine: the operations the service exposes, composed from the
// object store, compositor, recoder, writer, and rasterizer.
//
// Every operation validates its request before touching any document, and
// documents live only for the duration of one call.

use std::sync::Arc;

use pdfmaster_core::config::AppConfig;
use pdfmaster_core::error::{PdfMasterError, Result};
use pdfmaster_core::types::{
    DecryptOutcome, DocumentType, NamedOutput, QualityBand, WatermarkPosition,
};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;
use crate::pdf::recoder::recode_images;
use crate::pdf::store::{Page, PdfDocument, SaveOptions};
use crate::pdf::watermark::Watermarker;
use crate::pdf::writer::PdfWriter;
use crate::ranges::parse_ranges;
use crate::raster::{PageRasterizer, RASTERIZER_CAPABILITY};
use crate::text::{BuiltinMetrics, StandardFont};

/// Text stamped when a watermark request gives none.
pub const DEFAULT_WATERMARK_TEXT: &str = "CONFIDENTIAL";

/// One operation with its inputs.
#[derive(Debug, Clone)]
pub enum TransformRequest {
    /// Concatenate every page of every document, in request order.
    Combine { documents: Vec<Vec<u8>> },
    /// One output per range; the whole document when `ranges` is absent.
    Partition {
        document: Vec<u8>,
        ranges: Option<String>,
    },
    /// Re-encode embedded images at the band's quality and compact the file.
    Recompress { document: Vec<u8>, band: QualityBand },
    /// One PNG per page.
    Rasterize { document: Vec<u8> },
    /// One page per image, in request order.
    Derasterize { images: Vec<Vec<u8>> },
    /// Remove encryption, with or without a credential.
    Decrypt {
        document: Vec<u8>,
        credential: Option<String>,
    },
    /// Stamp `text` on every page.
    Watermark {
        document: Vec<u8>,
        text: String,
        position: WatermarkPosition,
    },
}

impl TransformRequest {
    /// Short operation name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Combine { .. } => "combine",
            Self::Partition { .. } => "partition",
            Self::Recompress { .. } => "recompress",
            Self::Rasterize { .. } => "rasterize",
            Self::Derasterize { .. } => "derasterize",
            Self::Decrypt { .. } => "decrypt",
            Self::Watermark { .. } => "watermark",
        }
    }

    /// Checks that need no parsing: input counts and parameter values.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Combine { documents } if documents.len() < 2 => {
                Err(PdfMasterError::NotEnoughInputs {
                    required: 2,
                    provided: documents.len(),
                })
            }
            Self::Derasterize { images } if images.is_empty() => {
                Err(PdfMasterError::NotEnoughInputs {
                    required: 1,
                    provided: 0,
                })
            }
            Self::Partition {
                ranges: Some(ranges),
                ..
            } => {
                // Syntax only; bounds are clamped once the page count is known.
                parse_ranges(Some(ranges), usize::MAX).map(|_| ())
            }
            Self::Watermark { text, .. } if text.trim().is_empty() => {
                Err(PdfMasterError::InvalidParameter {
                    name: "text",
                    reason: "watermark text must not be empty".into(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Result of one operation.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Output documents or images, in order.
    pub outputs: Vec<NamedOutput>,
    /// Archive name used when the outputs are packaged together.
    pub archive_name: Option<&'static str>,
    /// How a decrypt request opened the document.
    pub decrypt_outcome: Option<DecryptOutcome>,
}

impl TransformOutput {
    fn single(output: NamedOutput) -> Self {
        Self {
            outputs: vec![output],
            archive_name: None,
            decrypt_outcome: None,
        }
    }

    fn several(outputs: Vec<NamedOutput>, archive_name: &'static str) -> Self {
        Self {
            outputs,
            archive_name: Some(archive_name),
            decrypt_outcome: None,
        }
    }
}

/// Runs transform requests. Holds only configuration and capability
/// handles, so one engine can serve concurrent requests.
pub struct TransformEngine {
    config: AppConfig,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl TransformEngine {
    /// An engine without a page rasterizer; rasterize requests fail with
    /// [`PdfMasterError::CapabilityUnavailable`].
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            rasterizer: None,
        }
    }

    /// Attach the page rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn has_rasterizer(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Validate and run `request`.
    #[instrument(skip_all, fields(operation = request.operation()))]
    pub fn execute(&self, request: TransformRequest) -> Result<TransformOutput> {
        request.validate()?;
        let output = match request {
            TransformRequest::Combine { documents } => self.combine(&documents),
            TransformRequest::Partition { document, ranges } => {
                self.partition(&document, ranges.as_deref())
            }
            TransformRequest::Recompress { document, band } => self.recompress(&document, band),
            TransformRequest::Rasterize { document } => self.rasterize(&document),
            TransformRequest::Derasterize { images } => self.derasterize(&images),
            TransformRequest::Decrypt {
                document,
                credential,
            } => self.decrypt(&document, credential.as_deref()),
            TransformRequest::Watermark {
                document,
                text,
                position,
            } => self.watermark(&document, &text, position),
        };
        match &output {
            Ok(output) => info!(outputs = output.outputs.len(), "Operation complete"),
            Err(err) => warn!(error = %err, kind = ?err.kind(), "Operation failed"),
        }
        output
    }

    // -- Operations -----------------------------------------------------------

    /// Concatenate all pages of all `documents`. Every input is parsed before
    /// any page is copied; one unreadable input aborts the whole combine.
    pub fn combine(&self, documents: &[Vec<u8>]) -> Result<TransformOutput> {
        if documents.len() < 2 {
            return Err(PdfMasterError::NotEnoughInputs {
                required: 2,
                provided: documents.len(),
            });
        }

        let sources = documents
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                PdfDocument::parse(bytes).map_err(|err| PdfMasterError::for_item(index + 1, err))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut combined = PdfDocument::empty();
        for source in &sources {
            for page in source.pages() {
                combined.copy_page(source, &page)?;
            }
        }
        debug!(
            inputs = sources.len(),
            pages = combined.page_count(),
            "Documents combined"
        );

        let bytes = combined.serialize(SaveOptions::default())?;
        Ok(TransformOutput::single(NamedOutput::new(
            "merged.pdf",
            DocumentType::Pdf,
            bytes,
        )))
    }

    /// Split into one document per range. A malformed range rejects the
    /// request before any output is produced.
    pub fn partition(&self, document: &[u8], ranges: Option<&str>) -> Result<TransformOutput> {
        let source = PdfDocument::parse(document)?;
        let spans = parse_ranges(ranges, source.page_count())?;
        let pages = source.pages();

        let mut outputs = Vec::with_capacity(spans.len());
        for (number, span) in spans.iter().enumerate() {
            let mut part = PdfDocument::empty();
            for index in span.indices() {
                part.copy_page(&source, &pages[index])?;
            }
            debug!(part = number + 1, first = span.first, last = span.last, "Range extracted");
            outputs.push(NamedOutput::new(
                format!("split_{}.pdf", number + 1),
                DocumentType::Pdf,
                part.serialize(SaveOptions::default())?,
            ));
        }

        Ok(TransformOutput::several(outputs, "splits.zip"))
    }

    /// Re-encode every embedded image at the band's quality, then write with
    /// compressed streams and a consolidated object table. Images that cannot
    /// be recoded are kept as they are.
    pub fn recompress(&self, document: &[u8], band: QualityBand) -> Result<TransformOutput> {
        let quality = self.config.quality_bands.quality(band);
        let mut working = PdfDocument::parse(document)?;

        let report = recode_images(&mut working, quality)?;
        if !report.skipped.is_empty() {
            warn!(
                skipped = report.skipped.len(),
                "Some images were left at their original encoding"
            );
        }

        let bytes = working.serialize(SaveOptions::compact())?;
        info!(
            band = band.as_str(),
            input_bytes = document.len(),
            output_bytes = bytes.len(),
            "Document recompressed"
        );
        Ok(TransformOutput::single(NamedOutput::new(
            format!("compressed_{}.pdf", band.as_str()),
            DocumentType::Pdf,
            bytes,
        )))
    }

    /// Render every page to PNG at the configured scale. One failed page
    /// fails the operation.
    pub fn rasterize(&self, document: &[u8]) -> Result<TransformOutput> {
        let rasterizer =
            self.rasterizer
                .as_ref()
                .ok_or_else(|| PdfMasterError::CapabilityUnavailable {
                    capability: RASTERIZER_CAPABILITY,
                    reason: "no rasterizer is configured".into(),
                })?;

        // Same parse errors as every other operation.
        let parsed = PdfDocument::parse(document)?;
        let expected = parsed.page_count();

        let rendered = rasterizer.render_pages(document, self.config.raster.scale)?;
        if rendered.len() != expected {
            return Err(PdfMasterError::RenderFailed {
                page: rendered.len() + 1,
                reason: format!("rendered {} of {expected} pages", rendered.len()),
            });
        }

        let outputs = rendered
            .iter()
            .enumerate()
            .map(|(index, image)| {
                image
                    .to_png_bytes()
                    .map(|png| NamedOutput::new(format!("page-{}.png", index + 1), DocumentType::Png, png))
                    .map_err(|err| PdfMasterError::RenderFailed {
                        page: index + 1,
                        reason: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TransformOutput::several(outputs, "pages.zip"))
    }

    /// One page per image, each sized to the image at the configured DPI.
    /// Every image is decoded before the document is assembled.
    pub fn derasterize(&self, images: &[Vec<u8>]) -> Result<TransformOutput> {
        let decoded = images
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                ImageProcessor::from_bytes(bytes)
                    .map(ImageProcessor::into_rgb)
                    .map_err(|err| PdfMasterError::for_item(index + 1, err))
            })
            .collect::<Result<Vec<_>>>()?;

        let assembled = PdfWriter::new(self.config.derasterize_dpi).create_from_images(decoded)?;

        // Round-trip through the store so the output obeys the same
        // reference and compression rules as every other operation.
        let mut document = PdfDocument::parse(&assembled).map_err(|err| {
            PdfMasterError::Unwritable(format!("assembled document did not parse: {err}"))
        })?;
        let bytes = document.serialize(SaveOptions {
            compress_streams: true,
            consolidate: false,
        })?;

        Ok(TransformOutput::single(NamedOutput::new(
            "images.pdf",
            DocumentType::Pdf,
            bytes,
        )))
    }

    /// Remove encryption. An empty credential counts as none.
    pub fn decrypt(&self, document: &[u8], credential: Option<&str>) -> Result<TransformOutput> {
        let credential = credential.filter(|c| !c.is_empty());
        let mut working = PdfDocument::parse_allow_locked(document)?;

        let outcome = working.decrypt(credential)?;
        match outcome {
            DecryptOutcome::WrongCredential => return Err(PdfMasterError::IncorrectPassword),
            DecryptOutcome::NoCredentialProvided => return Err(PdfMasterError::PasswordRequired),
            DecryptOutcome::AlreadyOpen
            | DecryptOutcome::Unlocked
            | DecryptOutcome::PermissionsStripped => {}
        }

        let bytes = working.serialize(SaveOptions::default())?;
        info!(outcome = outcome.as_str(), pages = working.page_count(), "Document decrypted");

        let mut output = TransformOutput::single(NamedOutput::new(
            "unlocked.pdf",
            DocumentType::Pdf,
            bytes,
        ));
        output.decrypt_outcome = Some(outcome);
        Ok(output)
    }

    /// Stamp `text` on every page. A failure on any page fails the whole
    /// document.
    pub fn watermark(
        &self,
        document: &[u8],
        text: &str,
        position: WatermarkPosition,
    ) -> Result<TransformOutput> {
        let mut working = PdfDocument::parse(document)?;
        let pages = working.pages();
        self.stamp_pages(&mut working, &pages, text, position)?;

        let bytes = working.serialize(SaveOptions::default())?;
        Ok(TransformOutput::single(NamedOutput::new(
            "watermarked.pdf",
            DocumentType::Pdf,
            bytes,
        )))
    }

    /// Stamp each of `pages`. The first page that cannot be stamped aborts
    /// the loop; the caller discards the partly stamped document.
    fn stamp_pages(
        &self,
        working: &mut PdfDocument,
        pages: &[Page],
        text: &str,
        position: WatermarkPosition,
    ) -> Result<()> {
        let config = &self.config.watermark;
        let measurer = BuiltinMetrics::new(StandardFont::from_fallback(&config.font_fallback));
        let watermarker = Watermarker::new(working, &measurer, config);

        for page in pages {
            watermarker.stamp(working, page, text, position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeRasterizer};
    use pdfmaster_core::error::ErrorKind;

    fn engine() -> TransformEngine {
        TransformEngine::new(AppConfig::default())
    }

    fn labels(bytes: &[u8]) -> Vec<String> {
        let doc = PdfDocument::parse(bytes).unwrap();
        doc.pages()
            .iter()
            .map(|page| testing::page_label(doc.as_lopdf(), page.id))
            .collect()
    }

    fn only_output(output: &TransformOutput) -> &[u8] {
        assert_eq!(output.outputs.len(), 1);
        &output.outputs[0].bytes
    }

    #[test]
    fn combine_concatenates_in_request_order() {
        let first = testing::sample_pdf(3, (612.0, 792.0));
        let second = testing::labelled_pdf(&["A", "B"], (595.0, 842.0));
        let output = engine().combine(&[first, second]).unwrap();

        assert_eq!(output.outputs[0].name, "merged.pdf");
        assert_eq!(
            labels(only_output(&output)),
            vec!["Page 1", "Page 2", "Page 3", "A", "B"]
        );
        let merged = PdfDocument::parse(only_output(&output)).unwrap();
        assert_eq!(merged.page(3).unwrap().width(), 595.0);
    }

    #[test]
    fn combine_needs_two_documents() {
        let err = engine()
            .execute(TransformRequest::Combine {
                documents: vec![testing::sample_pdf(1, (612.0, 792.0))],
            })
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PdfMasterError::NotEnoughInputs {
                required: 2,
                provided: 1
            }
        ));
    }

    #[test]
    fn combine_aborts_on_one_bad_input() {
        let err = engine()
            .combine(&[
                testing::sample_pdf(1, (612.0, 792.0)),
                b"%PDF-1.4 garbage".to_vec(),
            ])
            .err()
            .unwrap();
        assert!(matches!(err, PdfMasterError::BatchItemFailed { item: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::PartialItemFailure);
    }

    #[test]
    fn partition_without_ranges_returns_whole_document() {
        let output = engine()
            .partition(&testing::sample_pdf(5, (612.0, 792.0)), None)
            .unwrap();
        assert_eq!(output.outputs[0].name, "split_1.pdf");
        assert_eq!(labels(only_output(&output)).len(), 5);
    }

    #[test]
    fn partition_range_selects_pages_in_order() {
        let doc = testing::sample_pdf(8, (612.0, 792.0));
        let output = engine().partition(&doc, Some("2-5")).unwrap();
        assert_eq!(
            labels(only_output(&output)),
            vec!["Page 2", "Page 3", "Page 4", "Page 5"]
        );

        let swapped = engine().partition(&doc, Some("7-3")).unwrap();
        assert_eq!(
            labels(only_output(&swapped)),
            vec!["Page 3", "Page 4", "Page 5", "Page 6", "Page 7"]
        );
    }

    #[test]
    fn partition_multiple_ranges_names_each_part() {
        let doc = testing::sample_pdf(8, (612.0, 792.0));
        let output = engine().partition(&doc, Some("1,4-6,20")).unwrap();
        assert_eq!(output.archive_name, Some("splits.zip"));
        let names: Vec<&str> = output.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["split_1.pdf", "split_2.pdf", "split_3.pdf"]);
        assert_eq!(labels(&output.outputs[2].bytes), vec!["Page 8"]);
    }

    #[test]
    fn malformed_range_produces_nothing() {
        let request = TransformRequest::Partition {
            document: testing::sample_pdf(4, (612.0, 792.0)),
            ranges: Some("1-2,x".into()),
        };
        let err = engine().execute(request).err().unwrap();
        assert!(matches!(err, PdfMasterError::InvalidPageRange { .. }));
        assert_eq!(err.kind(), ErrorKind::InputError);
    }

    #[test]
    fn recompress_keeps_pages_and_image_identity() {
        let input = testing::image_pdf();
        let before = PdfDocument::parse(&input).unwrap();
        let page_count = before.page_count();

        let output = engine().recompress(&input, QualityBand::High).unwrap();
        assert_eq!(output.outputs[0].name, "compressed_high.pdf");

        let after = PdfDocument::parse(only_output(&output)).unwrap();
        assert_eq!(after.page_count(), page_count);
        // The page's /Im0 entry still resolves to a (now JPEG) image.
        let image = testing::named_xobject(after.as_lopdf(), after.page(0).unwrap().id, b"Im0");
        let stream = image.as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
    }

    #[test]
    fn rasterize_without_provider_fails_fast() {
        let err = engine()
            .rasterize(&testing::sample_pdf(2, (612.0, 792.0)))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
    }

    #[test]
    fn rasterize_names_pages() {
        let engine = engine().with_rasterizer(Arc::new(FakeRasterizer));
        let output = engine
            .rasterize(&testing::sample_pdf(3, (612.0, 792.0)))
            .unwrap();
        assert_eq!(output.archive_name, Some("pages.zip"));
        let names: Vec<&str> = output.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-3.png"]);
        assert!(output.outputs.iter().all(|o| o.document_type == DocumentType::Png));
    }

    #[test]
    fn rasterize_then_derasterize_keeps_pages_and_aspect() {
        let engine = engine().with_rasterizer(Arc::new(FakeRasterizer));
        let source = testing::sample_pdf(2, (612.0, 792.0));
        let pngs: Vec<Vec<u8>> = engine
            .rasterize(&source)
            .unwrap()
            .outputs
            .into_iter()
            .map(|o| o.bytes)
            .collect();

        let output = engine.derasterize(&pngs).unwrap();
        assert_eq!(output.outputs[0].name, "images.pdf");
        let rebuilt = PdfDocument::parse(only_output(&output)).unwrap();
        assert_eq!(rebuilt.page_count(), 2);
        let page = rebuilt.page(0).unwrap();
        let ratio = page.width() / page.height();
        assert!((ratio - 612.0 / 792.0).abs() < 0.01);
    }

    #[test]
    fn derasterize_aborts_on_bad_image() {
        let good = testing::sample_png(10, 10);
        let err = engine()
            .derasterize(&[good, b"not an image".to_vec()])
            .err()
            .unwrap();
        assert!(matches!(err, PdfMasterError::BatchItemFailed { item: 2, .. }));
    }

    #[test]
    fn derasterize_sizes_pages_at_configured_dpi() {
        let output = engine().derasterize(&[testing::sample_png(600, 300)]).unwrap();
        let doc = PdfDocument::parse(only_output(&output)).unwrap();
        let page = doc.page(0).unwrap();
        // 600 px at 300 dpi = 2 in = 144 pt.
        assert!((page.width() - 144.0).abs() < 0.5);
        assert!((page.height() - 72.0).abs() < 0.5);
    }

    #[test]
    fn decrypt_outcomes() {
        let locked = testing::encrypted_pdf(3, "secret");

        let unlocked = engine().decrypt(&locked, Some("secret")).unwrap();
        assert_eq!(unlocked.decrypt_outcome, Some(DecryptOutcome::Unlocked));
        assert_eq!(unlocked.outputs[0].name, "unlocked.pdf");
        assert_eq!(labels(only_output(&unlocked)).len(), 3);

        let wrong = engine().decrypt(&locked, Some("nope")).err().unwrap();
        assert!(matches!(wrong, PdfMasterError::IncorrectPassword));
        assert_eq!(wrong.kind(), ErrorKind::InputError);

        let missing = engine().decrypt(&locked, Some("")).err().unwrap();
        assert!(matches!(missing, PdfMasterError::PasswordRequired));

        let open = engine()
            .decrypt(&testing::sample_pdf(2, (612.0, 792.0)), Some("whatever"))
            .unwrap();
        assert_eq!(open.decrypt_outcome, Some(DecryptOutcome::AlreadyOpen));
        assert_eq!(labels(only_output(&open)).len(), 2);
    }

    #[test]
    fn decrypt_without_credential_strips_permissions() {
        let restricted = testing::encrypted_pdf_with_owner(2, "", "owner-secret");
        let output = engine().decrypt(&restricted, None).unwrap();
        assert_eq!(
            output.decrypt_outcome,
            Some(DecryptOutcome::PermissionsStripped)
        );

        let reopened = PdfDocument::parse(only_output(&output)).unwrap();
        assert!(!reopened.as_lopdf().trailer.has(b"Encrypt"));
        assert_eq!(labels(only_output(&output)), vec!["Page 1", "Page 2"]);
    }

    #[test]
    fn watermark_stamps_every_page() {
        let doc = testing::labelled_pdf(&["one", "two"], (612.0, 792.0));
        let output = engine()
            .watermark(&doc, "DRAFT", WatermarkPosition::Center)
            .unwrap();
        assert_eq!(output.outputs[0].name, "watermarked.pdf");

        let stamped = PdfDocument::parse(only_output(&output)).unwrap();
        for page in stamped.pages() {
            let content = stamped.as_lopdf().get_page_content(page.id).unwrap();
            let text = String::from_utf8_lossy(&content);
            assert!(text.contains("(DRAFT)"), "page {} not stamped", page.index + 1);
        }
        assert_eq!(labels(only_output(&output)), vec!["one", "two"]);
    }

    #[test]
    fn watermark_handles_mixed_page_sizes() {
        let small = testing::sample_pdf(1, (200.0, 200.0));
        let large = testing::sample_pdf(1, (1000.0, 1400.0));
        let mixed = engine().combine(&[small, large]).unwrap().outputs.remove(0).bytes;
        assert!(engine()
            .watermark(&mixed, DEFAULT_WATERMARK_TEXT, WatermarkPosition::TopRight)
            .is_ok());
    }

    #[test]
    fn watermark_failure_on_one_page_aborts_the_document() {
        let mut working = PdfDocument::parse(&testing::sample_pdf(3, (612.0, 792.0))).unwrap();
        let pages = working.pages();
        working
            .as_lopdf_mut()
            .objects
            .insert(pages[1].id, lopdf::Object::Null);

        let err = engine()
            .stamp_pages(&mut working, &pages, "DRAFT", WatermarkPosition::Center)
            .err()
            .unwrap();
        assert!(matches!(err, PdfMasterError::CompositeFailed { page: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::InputError);
    }

    #[test]
    fn empty_watermark_text_is_rejected() {
        let err = engine()
            .execute(TransformRequest::Watermark {
                document: testing::sample_pdf(1, (612.0, 792.0)),
                text: "  ".into(),
                position: WatermarkPosition::Center,
            })
            .err()
            .unwrap();
        assert!(matches!(err, PdfMasterError::InvalidParameter { name: "text", .. }));
    }

    #[test]
    fn encrypted_input_is_rejected_by_other_operations() {
        let locked = testing::encrypted_pdf(1, "secret");
        let err = engine()
            .watermark(&locked, "X", WatermarkPosition::Center)
            .err()
            .unwrap();
        assert!(matches!(err, PdfMasterError::Encrypted));

        let restricted = testing::encrypted_pdf_with_owner(1, "", "owner-secret");
        let err = engine().partition(&restricted, Some("1")).err().unwrap();
        assert!(matches!(err, PdfMasterError::Encrypted));
    }
}
