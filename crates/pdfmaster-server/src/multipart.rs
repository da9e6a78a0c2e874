// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// multipart/form-data decoding for uploads.

use pdfmaster_core::error::{PdfMasterError, Result};

use crate::http::find_subsequence;

/// One field of a submitted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    /// Client-side file name, present for file inputs.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormPart {
    fn is_upload(&self) -> bool {
        match self.filename.as_deref() {
            Some("") => !self.data.is_empty(),
            Some(_) => true,
            None => false,
        }
    }
}

/// A decoded form, fields in submission order.
#[derive(Debug, Clone, Default)]
pub struct Form {
    parts: Vec<FormPart>,
}

impl Form {
    /// Decode `body` using the boundary from `content_type`.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Self> {
        let content_type = content_type.ok_or_else(|| malformed("missing Content-Type"))?;
        if !content_type
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
        {
            return Err(malformed("expected multipart/form-data"));
        }
        let boundary = boundary(content_type).ok_or_else(|| malformed("missing boundary"))?;
        let delimiter = format!("--{boundary}").into_bytes();
        let mut separator = b"\r\n".to_vec();
        separator.extend_from_slice(&delimiter);

        let start = find_subsequence(body, &delimiter)
            .ok_or_else(|| malformed("boundary not found in body"))?;
        let mut rest = &body[start + delimiter.len()..];
        let mut parts = Vec::new();

        loop {
            if rest.starts_with(b"--") {
                break;
            }
            rest = rest
                .strip_prefix(b"\r\n")
                .ok_or_else(|| malformed("bad boundary line"))?;

            let head_end = find_subsequence(rest, b"\r\n\r\n")
                .ok_or_else(|| malformed("part headers not terminated"))?;
            let head = String::from_utf8_lossy(&rest[..head_end]).to_string();
            let content = &rest[head_end + 4..];
            let data_end = find_subsequence(content, &separator)
                .ok_or_else(|| malformed("closing boundary not found"))?;

            parts.push(part(&head, content[..data_end].to_vec())?);
            rest = &content[data_end + separator.len()..];
        }

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Every upload under `name`, in order. Zero-byte files are kept so the
    /// operation can reject them; a file input left blank (no file name and
    /// no content) is not an upload.
    pub fn files(&self, name: &str) -> Vec<Vec<u8>> {
        self.parts
            .iter()
            .filter(|part| part.name == name && part.is_upload())
            .map(|part| part.data.clone())
            .collect()
    }

    /// The first upload under `name`.
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files(name).into_iter().next()
    }

    /// The first text value under `name`, if valid UTF-8.
    pub fn text(&self, name: &str) -> Option<String> {
        self.parts
            .iter()
            .find(|part| part.name == name && part.filename.is_none())
            .and_then(|part| String::from_utf8(part.data.clone()).ok())
    }
}

fn part(head: &str, data: Vec<u8>) -> Result<FormPart> {
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in head.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if header.trim().eq_ignore_ascii_case("content-disposition") {
            name = parameter(value, "name");
            filename = parameter(value, "filename");
        } else if header.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    Ok(FormPart {
        name: name.ok_or_else(|| malformed("part without a name"))?,
        filename,
        content_type,
        data,
    })
}

fn boundary(content_type: &str) -> Option<String> {
    parameter(content_type, "boundary").filter(|value| !value.is_empty())
}

/// Value of `key=...` in a `;`-separated header, quotes removed. A `;`
/// inside a quoted value does not separate parameters.
fn parameter(header: &str, key: &str) -> Option<String> {
    split_parameters(header).into_iter().skip(1).find_map(|item| {
        let (k, v) = item.split_once('=')?;
        if !k.trim().eq_ignore_ascii_case(key) {
            return None;
        }
        let v = v.trim();
        Some(match v.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')) {
            Some(inner) => unescape(inner),
            None => v.to_string(),
        })
    })
}

fn split_parameters(header: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (index, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                items.push(&header[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    items.push(&header[start..]);
    items
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            other => out.push(other),
        }
    }
    out
}

fn malformed(reason: &str) -> PdfMasterError {
    PdfMasterError::InvalidParameter {
        name: "form",
        reason: reason.to_string(),
    }
}

/// Build a multipart body. Used by the tests of this crate.
#[cfg(test)]
pub(crate) fn encode(boundary: &str, fields: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPE: &str = "multipart/form-data; boundary=XyZ";

    #[test]
    fn files_and_text_fields() {
        let body = encode(
            "XyZ",
            &[
                ("files", Some("a.pdf"), b"first".as_slice()),
                ("files", Some("b.pdf"), b"second\r\nwith crlf".as_slice()),
                ("ranges", None, b"1-3".as_slice()),
            ],
        );
        let form = Form::parse(Some(CONTENT_TYPE), &body).unwrap();
        assert_eq!(form.parts().len(), 3);
        assert_eq!(
            form.files("files"),
            vec![b"first".to_vec(), b"second\r\nwith crlf".to_vec()]
        );
        assert_eq!(form.text("ranges").as_deref(), Some("1-3"));
        assert_eq!(form.parts()[0].filename.as_deref(), Some("a.pdf"));
        assert!(form.file("missing").is_none());
    }

    #[test]
    fn quoted_boundary() {
        let body = encode("a b", &[("text", None, b"hi".as_slice())]);
        let form = Form::parse(Some("multipart/form-data; boundary=\"a b\""), &body).unwrap();
        assert_eq!(form.text("text").as_deref(), Some("hi"));
    }

    #[test]
    fn zero_byte_files_are_kept() {
        let body = encode(
            "XyZ",
            &[
                ("files", Some("a.pdf"), b"first".as_slice()),
                ("files", Some("empty.pdf"), b"".as_slice()),
            ],
        );
        let form = Form::parse(Some(CONTENT_TYPE), &body).unwrap();
        assert_eq!(form.files("files"), vec![b"first".to_vec(), Vec::new()]);
    }

    #[test]
    fn blank_file_input_is_not_an_upload() {
        let body = encode("XyZ", &[("file", Some(""), b"".as_slice())]);
        let form = Form::parse(Some(CONTENT_TYPE), &body).unwrap();
        assert!(form.file("file").is_none());
    }

    #[test]
    fn quoted_semicolon_stays_in_file_name() {
        let body = b"--XyZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a;b \\\"x\\\".pdf\"\r\n\r\ndata\r\n--XyZ--\r\n";
        let form = Form::parse(Some(CONTENT_TYPE), body).unwrap();
        assert_eq!(form.parts()[0].name, "file");
        assert_eq!(form.parts()[0].filename.as_deref(), Some("a;b \"x\".pdf"));
        assert_eq!(form.file("file"), Some(b"data".to_vec()));
    }

    #[test]
    fn wrong_content_type_is_rejected() {
        assert!(Form::parse(Some("application/json"), b"{}".as_slice()).is_err());
        assert!(Form::parse(None, b"".as_slice()).is_err());
        assert!(Form::parse(Some("multipart/form-data"), b"".as_slice()).is_err());
    }

    #[test]
    fn truncated_body_is_rejected() {
        let body = b"--XyZ\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nno end";
        assert!(Form::parse(Some(CONTENT_TYPE), body).is_err());
    }
}
