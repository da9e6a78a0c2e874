// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Endpoint routing: map each path to a transform request, run it on a
// blocking worker, and turn the result into a response.
//
// # Endpoints
//
//   GET  /                   health check
//   POST /api/merge          files=<pdf>...
//   POST /api/split          file=<pdf>, ranges?
//   POST /api/compress       file=<pdf>, level? (low | medium | high)
//   POST /api/image-to-pdf   files=<image>...
//   POST /api/pdf-to-image   file=<pdf>
//   POST /api/unlock         file=<pdf>, password?
//   POST /api/watermark      file=<pdf>, text?, position?

use std::sync::Arc;

use pdfmaster_core::error::{ErrorKind, PdfMasterError, Result};
use pdfmaster_core::failure::Failure;
use pdfmaster_core::types::{DecryptOutcome, NamedOutput, QualityBand, WatermarkPosition};
use pdfmaster_document::{DEFAULT_WATERMARK_TEXT, TransformEngine, TransformRequest};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::http::{HttpRequest, HttpResponse};
use crate::multipart::Form;
use crate::package::package;

/// Service name reported by the health check.
const SERVICE_NAME: &str = "PDFMaster Pro API";

/// Header reporting how an unlock request opened the document.
pub const DECRYPT_OUTCOME_HEADER: &str = "X-Decrypt-Outcome";

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// The transform endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Merge,
    Split,
    Compress,
    ImageToPdf,
    PdfToImage,
    Unlock,
    Watermark,
}

impl Endpoint {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/api/merge" => Some(Self::Merge),
            "/api/split" => Some(Self::Split),
            "/api/compress" => Some(Self::Compress),
            "/api/image-to-pdf" => Some(Self::ImageToPdf),
            "/api/pdf-to-image" => Some(Self::PdfToImage),
            "/api/unlock" => Some(Self::Unlock),
            "/api/watermark" => Some(Self::Watermark),
            _ => None,
        }
    }

    /// Build the transform request from the submitted form.
    pub fn request(self, form: &Form) -> Result<TransformRequest> {
        let request = match self {
            Self::Merge => TransformRequest::Combine {
                documents: form.files("files"),
            },
            Self::Split => TransformRequest::Partition {
                document: required_file(form)?,
                ranges: optional_text(form, "ranges"),
            },
            Self::Compress => TransformRequest::Recompress {
                document: required_file(form)?,
                band: match optional_text(form, "level") {
                    Some(level) => level.parse::<QualityBand>()?,
                    None => QualityBand::default(),
                },
            },
            Self::ImageToPdf => TransformRequest::Derasterize {
                images: form.files("files"),
            },
            Self::PdfToImage => TransformRequest::Rasterize {
                document: required_file(form)?,
            },
            Self::Unlock => TransformRequest::Decrypt {
                document: required_file(form)?,
                credential: optional_text(form, "password"),
            },
            Self::Watermark => TransformRequest::Watermark {
                document: required_file(form)?,
                text: form
                    .text("text")
                    .unwrap_or_else(|| DEFAULT_WATERMARK_TEXT.to_string()),
                position: match optional_text(form, "position") {
                    Some(position) => position.parse::<WatermarkPosition>()?,
                    None => WatermarkPosition::default(),
                },
            },
        };
        Ok(request)
    }
}

fn required_file(form: &Form) -> Result<Vec<u8>> {
    form.file("file").ok_or_else(|| PdfMasterError::InvalidParameter {
        name: "file",
        reason: "a file upload is required".into(),
    })
}

/// A text field, treating blank as absent.
fn optional_text(form: &Form, name: &str) -> Option<String> {
    form.text(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatches requests to the engine. Cheap to share across connections.
pub struct Router {
    engine: Arc<TransformEngine>,
    /// Bounds how many transforms run at once.
    limiter: Arc<Semaphore>,
}

impl Router {
    pub fn new(engine: TransformEngine) -> Self {
        let permits = engine.config().server.max_concurrent_requests.max(1);
        Self {
            engine: Arc::new(engine),
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Produce the response for one request. Never fails; errors become
    /// JSON failure bodies.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let response = match (request.method.as_str(), request.path.as_str()) {
            ("OPTIONS", _) => HttpResponse::new(204),
            ("GET", "/") => HttpResponse::json(
                200,
                &json!({ "name": SERVICE_NAME, "status": "ok" }),
            ),
            (method, path) => match Endpoint::from_path(path) {
                Some(endpoint) if method == "POST" => self.transform(endpoint, &request).await,
                Some(_) => failure_response(
                    Failure::new(ErrorKind::InputError, format!("{method} is not allowed here"))
                        .with_status(405),
                ),
                None => failure_response(
                    Failure::new(ErrorKind::InputError, format!("no endpoint at {path}"))
                        .with_status(404),
                ),
            },
        };
        with_cors(response)
    }

    async fn transform(&self, endpoint: Endpoint, request: &HttpRequest) -> HttpResponse {
        let transform = match Form::parse(request.header("content-type"), &request.body)
            .and_then(|form| endpoint.request(&form))
        {
            Ok(transform) => transform,
            Err(err) => return failure_response(Failure::from(&err)),
        };

        let Ok(_permit) = Arc::clone(&self.limiter).acquire_owned().await else {
            return failure_response(Failure::new(
                ErrorKind::CapabilityUnavailable,
                "the server is shutting down",
            ));
        };

        let engine = Arc::clone(&self.engine);
        let joined = tokio::task::spawn_blocking(move || {
            let output = engine.execute(transform)?;
            let outcome = output.decrypt_outcome;
            package(output).map(|packaged| (packaged, outcome))
        })
        .await;

        match joined {
            Ok(Ok((output, outcome))) => success_response(output, outcome),
            Ok(Err(err)) => failure_response(Failure::from(&err)),
            Err(err) => {
                error!(error = %err, ?endpoint, "transform worker panicked");
                failure_response(Failure::new(
                    ErrorKind::InternalInvariantViolation,
                    "internal error while producing the document",
                ))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn success_response(output: NamedOutput, outcome: Option<DecryptOutcome>) -> HttpResponse {
    debug!(name = %output.name, bytes = output.bytes.len(), "Sending output");
    let mut response = HttpResponse::new(200)
        .with_header("Content-Type", output.document_type.mime_type())
        .with_header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", output.name),
        )
        .with_header("Cache-Control", "no-store");
    if let Some(outcome) = outcome {
        response = response.with_header(DECRYPT_OUTCOME_HEADER, outcome.as_str());
    }
    response.with_body(output.bytes)
}

pub(crate) fn failure_response(failure: Failure) -> HttpResponse {
    if failure.is_client_error() {
        debug!(status = failure.status, detail = %failure.detail, "Request rejected");
    } else {
        warn!(status = failure.status, kind = ?failure.kind, detail = %failure.detail, "Request failed");
    }
    HttpResponse::json(failure.status, &failure).with_header("Cache-Control", "no-store")
}

pub(crate) fn with_cors(response: HttpResponse) -> HttpResponse {
    response
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .with_header("Access-Control-Allow-Headers", "*")
        .with_header(
            "Access-Control-Expose-Headers",
            format!("Content-Disposition, {DECRYPT_OUTCOME_HEADER}"),
        )
}
