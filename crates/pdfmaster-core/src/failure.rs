// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing failure reports.
//
// Every error leaving the service is reduced to a machine-readable kind, a
// human-readable detail line, and an HTTP-equivalent status. Internal invariant
// violations are reported without their detail; the full error goes to the log.

use serde::Serialize;
use tracing::error;

use crate::error::{ErrorKind, PdfMasterError};

/// Structured failure returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Always `true`; kept so clients can test a single field.
    pub error: bool,
    /// Machine-readable classification.
    pub kind: ErrorKind,
    /// Human-readable explanation.
    pub detail: String,
    /// HTTP-equivalent status code.
    #[serde(skip)]
    pub status: u16,
}

impl Failure {
    /// Build a failure with an explicit kind and detail (used by transport
    /// code for errors that never reach the pipeline, e.g. an oversized body).
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            error: true,
            kind,
            detail: detail.into(),
            status: status_for(kind),
        }
    }

    /// Override the status while keeping kind and detail.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Whether the caller caused this failure (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

impl From<&PdfMasterError> for Failure {
    fn from(err: &PdfMasterError) -> Self {
        let kind = err.kind();
        let detail = match kind {
            ErrorKind::InternalInvariantViolation => {
                error!(error = %err, "internal invariant violated");
                "internal error while producing the document".to_string()
            }
            _ => describe(err),
        };
        Self::new(kind, detail)
    }
}

impl From<PdfMasterError> for Failure {
    fn from(err: PdfMasterError) -> Self {
        Self::from(&err)
    }
}

/// Status code for each kind.
pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::InputError | ErrorKind::PartialItemFailure => 400,
        ErrorKind::CapabilityUnavailable => 503,
        ErrorKind::InternalInvariantViolation => 500,
    }
}

/// Caller-facing wording. Mostly the error's own message; a few variants read
/// better rephrased.
fn describe(err: &PdfMasterError) -> String {
    match err {
        PdfMasterError::Encrypted => {
            "This PDF is password protected. Unlock it first, then try again.".to_string()
        }
        PdfMasterError::IncorrectPassword => "Incorrect password".to_string(),
        PdfMasterError::PasswordRequired => "Password required to unlock".to_string(),
        PdfMasterError::NotEnoughInputs {
            required: 2,
            provided,
        } => format!("Please upload at least two PDF files to merge (got {provided})."),
        PdfMasterError::BatchItemFailed { item, source } => {
            format!("Failed to read file #{item}: {}", describe(source))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_range_is_client_error() {
        let failure = Failure::from(PdfMasterError::InvalidPageRange {
            range: "3-x".into(),
        });
        assert_eq!(failure.kind, ErrorKind::InputError);
        assert_eq!(failure.status, 400);
        assert!(failure.is_client_error());
        assert!(failure.detail.contains("3-x"));
    }

    #[test]
    fn internal_detail_is_hidden() {
        let failure = Failure::from(PdfMasterError::Unwritable(
            "dangling reference (12, 0)".into(),
        ));
        assert_eq!(failure.status, 500);
        assert!(!failure.detail.contains("12"));
    }

    #[test]
    fn missing_provider_is_server_side() {
        let failure = Failure::from(PdfMasterError::CapabilityUnavailable {
            capability: "page rasterizer",
            reason: "libpdfium not found".into(),
        });
        assert_eq!(failure.kind, ErrorKind::CapabilityUnavailable);
        assert_eq!(failure.status, 503);
        assert!(!failure.is_client_error());
    }

    #[test]
    fn nested_item_failure_names_the_item() {
        let failure = Failure::from(PdfMasterError::for_item(
            3,
            PdfMasterError::MalformedDocument("missing header".into()),
        ));
        assert_eq!(failure.kind, ErrorKind::PartialItemFailure);
        assert_eq!(
            failure.detail,
            "Failed to read file #3: malformed document: missing header"
        );
    }

    #[test]
    fn serialises_without_status() {
        let failure = Failure::from(PdfMasterError::IncorrectPassword);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["kind"], "input_error");
        assert_eq!(json["detail"], "Incorrect password");
        assert!(json.get("status").is_none());
    }
}
