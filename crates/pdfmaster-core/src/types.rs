// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the PDFMaster transformation pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PdfMasterError;

/// Content types the service reads or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Png,
    Jpeg,
    Zip,
    Json,
}

impl DocumentType {
    /// MIME type string for the `Content-Type` header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Zip => "application/zip",
            Self::Json => "application/json",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "zip" => Some(Self::Zip),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// One named output buffer of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOutput {
    /// File name offered to the client (`merged.pdf`, `page-3.png`, ...).
    pub name: String,
    pub document_type: DocumentType,
    pub bytes: Vec<u8>,
}

impl NamedOutput {
    pub fn new(name: impl Into<String>, document_type: DocumentType, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            document_type,
            bytes,
        }
    }
}

/// Recompression strength. The numeric quality behind each band lives in
/// [`crate::config::QualityBands`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBand {
    Low,
    Medium,
    High,
}

impl QualityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Default for QualityBand {
    fn default() -> Self {
        Self::Medium
    }
}

impl FromStr for QualityBand {
    type Err = PdfMasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(PdfMasterError::InvalidParameter {
                name: "level",
                reason: "level must be one of: low, medium, high".into(),
            }),
        }
    }
}

impl std::fmt::Display for QualityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a watermark sits on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    Center,
}

impl Default for WatermarkPosition {
    fn default() -> Self {
        Self::Center
    }
}

impl FromStr for WatermarkPosition {
    type Err = PdfMasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "center" => Ok(Self::Center),
            other => Err(PdfMasterError::InvalidParameter {
                name: "position",
                reason: format!("unknown position '{other}' (expected top-left, top-right, or center)"),
            }),
        }
    }
}

/// Stacking order of an overlay relative to the page's existing marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZOrder {
    Above,
    Below,
}

/// Outcome of a decrypt attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecryptOutcome {
    /// The document was not encrypted.
    AlreadyOpen,
    /// The supplied credential was accepted.
    Unlocked,
    /// No credential was supplied but the empty user password opened the
    /// document. Only user-level access was obtained; the owner credential was
    /// not recovered and the permission restrictions were dropped on rewrite.
    PermissionsStripped,
    /// The supplied credential was rejected.
    WrongCredential,
    /// No credential was supplied and one is needed.
    NoCredentialProvided,
}

impl DecryptOutcome {
    /// Whether the document is readable after this outcome.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::AlreadyOpen | Self::Unlocked | Self::PermissionsStripped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyOpen => "already-open",
            Self::Unlocked => "unlocked",
            Self::PermissionsStripped => "permissions-stripped",
            Self::WrongCredential => "wrong-credential",
            Self::NoCredentialProvided => "no-credential-provided",
        }
    }
}
