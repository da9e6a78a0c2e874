// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfmaster-server: HTTP/1.1 front end for the PDFMaster transform engine.
//
// Thin glue: frame requests off raw TCP, decode multipart uploads, hand the
// work to the engine on a blocking worker, and package the outputs.

pub mod http;
pub mod multipart;
pub mod package;
pub mod routes;
pub mod server;

pub use server::ApiServer;
