// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PDFMaster.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of every error, used to pick the response status and
/// to decide what detail may be shown to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad upload, bad parameter, wrong credential, unsupported format.
    InputError,
    /// A required external provider is missing or misconfigured.
    CapabilityUnavailable,
    /// One item of a multi-item batch failed and the operation aborted.
    PartialItemFailure,
    /// The in-memory graph became inconsistent. Never caused by input alone.
    InternalInvariantViolation,
}

/// Top-level error type for all PDFMaster operations.
#[derive(Debug, Error)]
pub enum PdfMasterError {
    // -- Document codec --
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("document is encrypted; a password is required to read it")]
    Encrypted,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("password required to unlock")]
    PasswordRequired,

    // -- Request validation --
    #[error("invalid page range: {range}")]
    InvalidPageRange { range: String },

    #[error("invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("at least {required} input file(s) required, got {provided}")]
    NotEnoughInputs { required: usize, provided: usize },

    // -- Raster / rendering --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("page {page} could not be rendered: {reason}")]
    RenderFailed { page: usize, reason: String },

    #[error("page {page} could not be watermarked: {reason}")]
    CompositeFailed { page: usize, reason: String },

    // -- Batches --
    #[error("item {item} failed: {source}")]
    BatchItemFailed {
        item: usize,
        #[source]
        source: Box<PdfMasterError>,
    },

    // -- Providers --
    #[error("{capability} unavailable: {reason}")]
    CapabilityUnavailable {
        capability: &'static str,
        reason: String,
    },

    // -- Internal --
    #[error("document could not be written: {0}")]
    Unwritable(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PdfMasterError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedDocument(_)
            | Self::Encrypted
            | Self::IncorrectPassword
            | Self::PasswordRequired
            | Self::InvalidPageRange { .. }
            | Self::InvalidParameter { .. }
            | Self::NotEnoughInputs { .. }
            | Self::ImageError(_)
            | Self::RenderFailed { .. }
            | Self::CompositeFailed { .. } => ErrorKind::InputError,
            Self::BatchItemFailed { source, .. } => match source.kind() {
                // A missing provider or a broken invariant keeps its own class
                // even when it surfaced on a single item.
                kind @ (ErrorKind::CapabilityUnavailable
                | ErrorKind::InternalInvariantViolation) => kind,
                _ => ErrorKind::PartialItemFailure,
            },
            Self::CapabilityUnavailable { .. } => ErrorKind::CapabilityUnavailable,
            Self::Unwritable(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorKind::InternalInvariantViolation
            }
        }
    }

    /// Wrap an error as the failure of item `item` (1-based) of a batch.
    pub fn for_item(item: usize, source: PdfMasterError) -> Self {
        Self::BatchItemFailed {
            item,
            source: Box::new(source),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PdfMasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_item_inherits_capability_kind() {
        let err = PdfMasterError::for_item(
            2,
            PdfMasterError::CapabilityUnavailable {
                capability: "page rasterizer",
                reason: "library not found".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
    }

    #[test]
    fn batch_item_of_bad_input_is_partial_failure() {
        let err = PdfMasterError::for_item(1, PdfMasterError::MalformedDocument("eof".into()));
        assert_eq!(err.kind(), ErrorKind::PartialItemFailure);
        assert_eq!(err.to_string(), "item 1 failed: malformed document: eof");
    }

    #[test]
    fn unwritable_is_internal() {
        let err = PdfMasterError::Unwritable("dangling reference 4 0 R".into());
        assert_eq!(err.kind(), ErrorKind::InternalInvariantViolation);
    }
}
