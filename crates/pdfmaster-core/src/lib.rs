// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFMaster: Core types, configuration, and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod failure;
pub mod types;

pub use config::AppConfig;
pub use error::{ErrorKind, PdfMasterError, Result};
pub use failure::Failure;
pub use types::*;
