// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: raster decode/encode capability used by recompression,
// rasterization, and image-to-PDF assembly.

pub mod processor;

pub use processor::{ImageProcessor, SampleLayout};
