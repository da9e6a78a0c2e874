// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image recoder: re-encode every embedded raster image reachable from the
// page tree as JPEG at a given quality, in place.

use std::collections::BTreeSet;

use lopdf::{Dictionary, Object, ObjectId, Stream};
use pdfmaster_core::error::{PdfMasterError, Result};
use tracing::{debug, info, instrument, warn};

use super::store::{PdfDocument, resolve};
use crate::image::{ImageProcessor, SampleLayout};

/// Bound on nested form XObjects followed while collecting images.
const MAX_FORM_DEPTH: usize = 16;

/// Outcome of a recompression pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecodeReport {
    /// Images whose payload was replaced.
    pub recoded: Vec<ObjectId>,
    /// Images left untouched, with the reason.
    pub skipped: Vec<(ObjectId, String)>,
}

/// Re-encode every image reachable from any page at `quality` (in `(0, 1]`).
///
/// Each image keeps its object id, so no page or resource mapping changes.
/// An image that cannot be decoded or re-encoded is skipped and keeps its
/// original bytes; it never aborts the pass.
#[instrument(skip(document), fields(pages = document.page_count()))]
pub fn recode_images(document: &mut PdfDocument, quality: f32) -> Result<RecodeReport> {
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(PdfMasterError::InvalidParameter {
            name: "quality",
            reason: format!("{quality} is outside (0, 1]"),
        });
    }
    let jpeg_quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;

    let images = collect_images(document);
    info!(images = images.len(), jpeg_quality, "Recompressing images");

    let mut report = RecodeReport::default();
    for id in images {
        let reencoded = match document.as_lopdf().get_object(id) {
            Ok(Object::Stream(stream)) => reencode(document, stream, jpeg_quality),
            _ => Err("image is not a stream".to_string()),
        };

        match reencoded {
            Ok(replacement) => {
                if let Ok(Object::Stream(stream)) = document.as_lopdf_mut().get_object_mut(id) {
                    replace_payload(stream, replacement);
                    report.recoded.push(id);
                }
            }
            Err(reason) => {
                warn!(?id, %reason, "Image left untouched");
                report.skipped.push((id, reason));
            }
        }
    }

    debug!(
        recoded = report.recoded.len(),
        skipped = report.skipped.len(),
        "Recompression pass complete"
    );
    Ok(report)
}

/// Ids of image XObjects reachable from the page tree, through nested forms.
fn collect_images(document: &PdfDocument) -> BTreeSet<ObjectId> {
    let mut images = BTreeSet::new();
    let mut visited_forms = BTreeSet::new();

    for page in document.pages() {
        if let Some(resources) = document.inherited_attribute(page.id, b"Resources") {
            collect_from_resources(document, resources, &mut images, &mut visited_forms, 0);
        }
    }
    images
}

fn collect_from_resources(
    document: &PdfDocument,
    resources: &Object,
    images: &mut BTreeSet<ObjectId>,
    visited_forms: &mut BTreeSet<ObjectId>,
    depth: usize,
) {
    if depth > MAX_FORM_DEPTH {
        return;
    }
    let Some(Object::Dictionary(resources)) = document.resolve(resources) else {
        return;
    };
    let Some(Object::Dictionary(xobjects)) = resources
        .get(b"XObject")
        .ok()
        .and_then(|object| document.resolve(object))
    else {
        return;
    };

    for (_, entry) in xobjects.iter() {
        let Object::Reference(id) = entry else {
            continue;
        };
        let Ok(Object::Stream(stream)) = document.as_lopdf().get_object(*id) else {
            continue;
        };
        match name(&stream.dict, b"Subtype") {
            Some(b"Image") => {
                images.insert(*id);
            }
            Some(b"Form") if visited_forms.insert(*id) => {
                if let Ok(form_resources) = stream.dict.get(b"Resources") {
                    collect_from_resources(
                        document,
                        form_resources,
                        images,
                        visited_forms,
                        depth + 1,
                    );
                }
            }
            _ => {}
        }
    }
}

/// A re-encoded payload ready to replace an image stream's bytes.
struct Replacement {
    jpeg: Vec<u8>,
    grayscale: bool,
}

fn reencode(
    document: &PdfDocument,
    stream: &Stream,
    quality: u8,
) -> std::result::Result<Replacement, String> {
    let color_space = resolved_color_space(document.as_lopdf(), &stream.dict);
    let processor = decode_image(stream, color_space.as_ref())?;
    let jpeg = processor
        .to_jpeg_bytes(quality)
        .map_err(|err| err.to_string())?;
    Ok(Replacement {
        jpeg,
        grayscale: processor.is_grayscale(),
    })
}

/// Decode an image XObject's samples through the raster codec.
/// `color_space` is the image's /ColorSpace with references resolved.
fn decode_image(
    stream: &Stream,
    color_space: Option<&Object>,
) -> std::result::Result<ImageProcessor, String> {
    let dict = &stream.dict;

    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return Err("stencil masks are not recoded".into());
    }
    if dict.has(b"Decode") {
        return Err("custom /Decode arrays are not supported".into());
    }

    let filters = filters(dict);
    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        if filters.len() != 1 {
            return Err("chained filters ending in DCTDecode are not supported".into());
        }
        return ImageProcessor::from_jpeg(&stream.content).map_err(|err| err.to_string());
    }
    if let Some(other) = filters.iter().find(|f| {
        matches!(
            f.as_slice(),
            b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode"
        )
    }) {
        return Err(format!(
            "{} images are not supported",
            String::from_utf8_lossy(other)
        ));
    }

    let width = integer(dict, b"Width").ok_or("missing /Width")?;
    let height = integer(dict, b"Height").ok_or("missing /Height")?;
    let bits = integer(dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(format!("{bits} bits per component is not supported"));
    }
    let layout = sample_layout(color_space)?;

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|err| format!("cannot decompress image: {err}"))?
    };

    ImageProcessor::from_samples(width, height, layout, &samples).map_err(|err| err.to_string())
}

/// Sample layout for a colour space, when it is one of the device spaces or
/// an equivalent ICC-based space.
fn sample_layout(color_space: Option<&Object>) -> std::result::Result<SampleLayout, String> {
    match color_space {
        Some(Object::Name(name)) => match name.as_slice() {
            b"DeviceGray" | b"G" => Ok(SampleLayout::Gray),
            b"DeviceRGB" | b"RGB" => Ok(SampleLayout::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(SampleLayout::Cmyk),
            other => Err(format!(
                "colour space {} is not supported",
                String::from_utf8_lossy(other)
            )),
        },
        Some(Object::Array(parts)) => match parts.first() {
            Some(Object::Name(family)) if family.as_slice() == b"ICCBased" => {
                let components = match parts.get(1) {
                    Some(Object::Stream(profile)) => integer(&profile.dict, b"N"),
                    _ => None,
                };
                match components {
                    Some(1) => Ok(SampleLayout::Gray),
                    Some(3) => Ok(SampleLayout::Rgb),
                    Some(4) => Ok(SampleLayout::Cmyk),
                    _ => Err("ICC profile with unknown component count".into()),
                }
            }
            Some(Object::Name(family)) => Err(format!(
                "colour space {} is not supported",
                String::from_utf8_lossy(family)
            )),
            _ => Err("malformed colour space".into()),
        },
        _ => Err("missing colour space".into()),
    }
}

fn replace_payload(stream: &mut Stream, replacement: Replacement) {
    let color_space: &[u8] = if replacement.grayscale {
        b"DeviceGray"
    } else {
        b"DeviceRGB"
    };
    stream.dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    stream.dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    stream.dict.set("BitsPerComponent", Object::Integer(8));
    stream.dict.remove(b"DecodeParms");
    stream.set_content(replacement.jpeg);
    stream.allows_compression = false;
}

fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(single)) => vec![single.clone()],
        Ok(Object::Array(chain)) => chain
            .iter()
            .filter_map(|f| match f {
                Object::Name(n) => Some(n.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn name<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match dict.get(key) {
        Ok(Object::Name(value)) => Some(value.as_slice()),
        _ => None,
    }
}

fn integer(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(value)) => u32::try_from(*value).ok(),
        _ => None,
    }
}

/// The image's /ColorSpace with references resolved one level into arrays,
/// so an ICC profile stream's `/N` is readable.
fn resolved_color_space(document: &lopdf::Document, dict: &Dictionary) -> Option<Object> {
    let color_space = resolve(document, dict.get(b"ColorSpace").ok()?)?;
    match color_space {
        Object::Array(parts) => Some(Object::Array(
            parts
                .iter()
                .map(|part| resolve(document, part).cloned().unwrap_or(Object::Null))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::store::SaveOptions;
    use crate::testing;

    #[test]
    fn raw_image_is_recoded_in_place() {
        let mut doc = PdfDocument::parse(&testing::image_pdf()).unwrap();
        let (raw_id, _) = testing::image_ids(doc.as_lopdf());

        let report = recode_images(&mut doc, 0.4).unwrap();
        assert!(report.recoded.contains(&raw_id));

        let stream = doc.as_lopdf().get_object(raw_id).unwrap().as_stream().unwrap();
        assert_eq!(name(&stream.dict, b"Filter"), Some(b"DCTDecode".as_slice()));
        assert_eq!(integer(&stream.dict, b"Width"), Some(16));
        assert_eq!(integer(&stream.dict, b"Height"), Some(16));
        assert!(ImageProcessor::from_jpeg(&stream.content).is_ok());
    }

    #[test]
    fn corrupt_image_does_not_block_the_rest() {
        let mut doc = PdfDocument::parse(&testing::image_pdf()).unwrap();
        let (raw_id, corrupt_id) = testing::image_ids(doc.as_lopdf());
        let corrupt_before = doc
            .as_lopdf()
            .get_object(corrupt_id)
            .unwrap()
            .as_stream()
            .unwrap()
            .content
            .clone();

        let report = recode_images(&mut doc, 0.25).unwrap();
        assert_eq!(report.recoded, vec![raw_id]);
        assert!(report.skipped.iter().any(|(id, _)| *id == corrupt_id));

        let corrupt_after = &doc
            .as_lopdf()
            .get_object(corrupt_id)
            .unwrap()
            .as_stream()
            .unwrap()
            .content;
        assert_eq!(&corrupt_before, corrupt_after);

        // The page still references the same image objects.
        let bytes = doc.serialize(SaveOptions::default()).unwrap();
        let reparsed = PdfDocument::parse(&bytes).unwrap();
        assert_eq!(testing::image_ids(reparsed.as_lopdf()), (raw_id, corrupt_id));
    }

    #[test]
    fn stencil_masks_and_exotic_spaces_are_skipped() {
        let mut dict = Dictionary::new();
        dict.set("ImageMask", Object::Boolean(true));
        assert!(decode_image(&Stream::new(dict, vec![0; 8]), None).is_err());

        let indexed = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
        ]);
        assert!(sample_layout(Some(&indexed)).is_err());
        assert_eq!(
            sample_layout(Some(&Object::Name(b"DeviceCMYK".to_vec()))).unwrap(),
            SampleLayout::Cmyk
        );
    }

    #[test]
    fn quality_out_of_range_is_rejected_before_mutation() {
        let mut doc = PdfDocument::parse(&testing::image_pdf()).unwrap();
        assert!(recode_images(&mut doc, 0.0).is_err());
        assert!(recode_images(&mut doc, 1.2).is_err());
    }
}
