// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory fixtures shared by the unit tests of this crate and, through
// the `test-fixtures` feature, the server's.

use image::{DynamicImage, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use pdfmaster_core::error::Result;

use crate::image::ImageProcessor;
use crate::pdf::store::PdfDocument;
use crate::raster::PageRasterizer;

/// A document whose pages each draw their label (`Page 1`, `Page 2`, ...)
/// with one shared font through one shared resource dictionary.
pub fn sample_document(pages: usize, size: (f32, f32)) -> Document {
    let labels: Vec<String> = (1..=pages).map(|n| format!("Page {n}")).collect();
    labelled_document(&labels, size)
}

pub fn sample_pdf(pages: usize, size: (f32, f32)) -> Vec<u8> {
    save(sample_document(pages, size))
}

pub fn labelled_pdf(labels: &[&str], size: (f32, f32)) -> Vec<u8> {
    save(labelled_document(labels, size))
}

fn labelled_document<S: AsRef<str>>(labels: &[S], (width, height): (f32, f32)) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });

    let mut kids = Vec::new();
    for label in labels {
        let content = format!("BT /F1 24 Tf 72 72 Td ({}) Tj ET", label.as_ref());
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }

    finish(&mut doc, pages_id, kids, Dictionary::new());
    doc
}

/// One page with no geometry or resources of its own; both come from the
/// page-tree node.
pub fn inherited_geometry_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        b"BT /F1 12 Tf 10 10 Td (Inherited) Tj ET".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let inherited = dictionary! {
        "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        },
    };
    finish(&mut doc, pages_id, vec![Object::Reference(page_id)], inherited);
    save(doc)
}

/// One page drawing two images: `Im0` is raw 16x16 RGB, `Im1` claims to be
/// JPEG but is garbage.
pub fn image_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let pixels: Vec<u8> = (0..16u32 * 16)
        .flat_map(|i| [(i % 256) as u8, (i * 3 % 256) as u8, (255 - i % 256) as u8])
        .collect();
    let raw_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 16,
            "Height" => 16,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        pixels,
    ));
    let corrupt_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 8,
            "Height" => 8,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        b"\xff\xd8 definitely not a jpeg".to_vec(),
    ));

    let content = b"q 100 0 0 100 50 50 cm /Im0 Do Q q 50 0 0 50 200 200 cm /Im1 Do Q".to_vec();
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => Object::Reference(raw_id),
                "Im1" => Object::Reference(corrupt_id),
            },
        },
    });

    finish(&mut doc, pages_id, vec![Object::Reference(page_id)], Dictionary::new());
    save(doc)
}

/// Ids of `Im0` and `Im1` on the first page of an [`image_pdf`] document.
pub fn image_ids(doc: &Document) -> (ObjectId, ObjectId) {
    let page_id = *doc.get_pages().get(&1).expect("first page");
    let id = |name: &[u8]| {
        resource_entry(doc, page_id, b"XObject", name)
            .as_reference()
            .unwrap()
    };
    (id(b"Im0"), id(b"Im1"))
}

/// The XObject a page calls `name`, resolved.
pub fn named_xobject<'a>(doc: &'a Document, page_id: ObjectId, name: &[u8]) -> &'a Object {
    match resource_entry(doc, page_id, b"XObject", name) {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        direct => direct,
    }
}

/// The object id the page's resources call `F1`.
pub fn page_font(doc: &Document, page_id: ObjectId) -> ObjectId {
    resource_entry(doc, page_id, b"Font", b"F1")
        .as_reference()
        .unwrap()
}

fn resource_entry<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    category: &[u8],
    name: &[u8],
) -> &'a Object {
    let direct = |obj: &'a Object| -> &'a Dictionary {
        match obj {
            Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
            Object::Dictionary(dict) => dict,
            other => panic!("expected a dictionary, got {other:?}"),
        }
    };
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = direct(page.get(b"Resources").unwrap());
    let entries = direct(resources.get(category).unwrap());
    entries.get(name).unwrap()
}

/// The first string a page shows with `Tj`.
pub fn page_label(doc: &Document, page_id: ObjectId) -> String {
    let content = doc.get_page_content(page_id).unwrap();
    let decoded = Content::decode(&content).unwrap();
    decoded
        .operations
        .iter()
        .find(|op| op.operator == "Tj")
        .and_then(|op| op.operands.first())
        .and_then(|operand| match operand {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img))
        .to_png_bytes()
        .unwrap()
}

/// Rasterizer stand-in that paints each page a flat colour at its scaled
/// size.
pub struct FakeRasterizer;

impl PageRasterizer for FakeRasterizer {
    fn render_pages(&self, pdf: &[u8], scale: f32) -> Result<Vec<ImageProcessor>> {
        let doc = PdfDocument::parse(pdf)?;
        Ok(doc
            .pages()
            .iter()
            .map(|page| {
                let width = (page.width() * scale).round() as u32;
                let height = (page.height() * scale).round() as u32;
                let img = RgbImage::from_pixel(width, height, image::Rgb([240, 240, 240]));
                ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img))
            })
            .collect())
    }
}

// -- Encryption (RC4 40-bit, V=1, R=2) ----------------------------------------

const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j = 0usize;
    for i in 0..256 {
        j = (j + s[i] as usize + key[i % key.len()] as usize) & 0xFF;
        s.swap(i, j);
    }
    let (mut i, mut j) = (0usize, 0usize);
    data.iter()
        .map(|byte| {
            i = (i + 1) & 0xFF;
            j = (j + s[i] as usize) & 0xFF;
            s.swap(i, j);
            byte ^ s[(s[i] as usize + s[j] as usize) & 0xFF]
        })
        .collect()
}

/// A [`sample_document`] encrypted with `password` as both user and owner
/// password.
pub fn encrypted_pdf(pages: usize, password: &str) -> Vec<u8> {
    encrypted_pdf_with_owner(pages, password, password)
}

/// A [`sample_document`] encrypted with 40-bit RC4 (V1, R2), with separate
/// user and owner passwords.
pub fn encrypted_pdf_with_owner(pages: usize, user: &str, owner: &str) -> Vec<u8> {
    let file_id = b"pdfmaster-fixtur";
    let permissions: i32 = -4;

    let padded = pad_password(user);
    let owner_key = md5::compute(pad_password(owner));
    let o_value = rc4(&owner_key[..5], &padded);

    let mut key_input = padded.clone();
    key_input.extend_from_slice(&o_value);
    key_input.extend_from_slice(&(permissions as u32).to_le_bytes());
    key_input.extend_from_slice(file_id);
    let key = md5::compute(&key_input)[..5].to_vec();
    let u_value = rc4(&key, &PAD_BYTES);

    let mut doc = sample_document(pages, (612.0, 792.0));
    for (&(number, generation), object) in doc.objects.iter_mut() {
        let mut object_key = key.clone();
        object_key.extend_from_slice(&number.to_le_bytes()[..3]);
        object_key.extend_from_slice(&generation.to_le_bytes()[..2]);
        let digest = md5::compute(&object_key);
        let object_key = &digest[..(key.len() + 5).min(16)];

        match object {
            Object::Stream(stream) => {
                let encrypted = rc4(object_key, &stream.content);
                stream.set_content(encrypted);
            }
            Object::String(content, _) => *content = rc4(object_key, content),
            _ => {}
        }
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::String(o_value, StringFormat::Literal),
        "U" => Object::String(u_value, StringFormat::Literal),
        "P" => permissions as i64,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.to_vec(), StringFormat::Literal),
            Object::String(file_id.to_vec(), StringFormat::Literal),
        ]),
    );
    save(doc)
}

// -- Helpers ------------------------------------------------------------------

fn pad_password(password: &str) -> Vec<u8> {
    let mut padded = password.as_bytes()[..password.len().min(32)].to_vec();
    padded.extend_from_slice(&PAD_BYTES[..32 - padded.len()]);
    padded
}

fn finish(doc: &mut Document, pages_id: ObjectId, kids: Vec<Object>, mut node: Dictionary) {
    node.set("Type", "Pages");
    node.set("Count", kids.len() as i64);
    node.set("Kids", kids);
    doc.objects.insert(pages_id, Object::Dictionary(node));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
