// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output packaging: one output goes out as is, several go out as a zip.

use std::io::{Cursor, Write};

use pdfmaster_core::error::{PdfMasterError, Result};
use pdfmaster_core::types::{DocumentType, NamedOutput};
use pdfmaster_document::TransformOutput;
use tracing::{debug, instrument};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Name used when several outputs arrive without an archive name.
const DEFAULT_ARCHIVE_NAME: &str = "outputs.zip";

/// Reduce an operation's outputs to the single byte stream sent back.
#[instrument(skip_all, fields(outputs = output.outputs.len()))]
pub fn package(output: TransformOutput) -> Result<NamedOutput> {
    let TransformOutput {
        mut outputs,
        archive_name,
        ..
    } = output;

    match outputs.len() {
        0 => Err(PdfMasterError::Unwritable(
            "operation produced no output".into(),
        )),
        1 => Ok(outputs.remove(0)),
        _ => {
            let name = archive_name.unwrap_or(DEFAULT_ARCHIVE_NAME);
            let bytes = zip_outputs(&outputs)?;
            debug!(archive = name, bytes = bytes.len(), "Outputs archived");
            Ok(NamedOutput::new(name, DocumentType::Zip, bytes))
        }
    }
}

fn zip_outputs(outputs: &[NamedOutput]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for output in outputs {
        writer
            .start_file(output.name.as_str(), options)
            .map_err(archive_error)?;
        writer.write_all(&output.bytes)?;
    }

    let cursor = writer.finish().map_err(archive_error)?;
    Ok(cursor.into_inner())
}

fn archive_error(err: zip::result::ZipError) -> PdfMasterError {
    PdfMasterError::Unwritable(format!("archive: {err}"))
}
