// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PdfMasterError, Result};
use crate::types::QualityBand;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "PDFMASTER_CONFIG";

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PORT";

/// Service settings. Every field has a default so a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub raster: RasterConfig,
    /// Canonical resolution assumed for uploaded images when sizing their
    /// pages: a `w`x`h` pixel image becomes a `w/dpi` x `h/dpi` inch page.
    pub derasterize_dpi: f32,
    pub quality_bands: QualityBands,
    pub watermark: WatermarkConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests with a larger body are rejected before parsing.
    pub max_upload_bytes: usize,
    /// Upper bound on requests processed at once.
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 64 * 1024 * 1024,
            max_concurrent_requests: 8,
        }
    }
}

/// Page rasterizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Upscaling factor applied to page geometry (1.0 = 72 px per inch).
    pub scale: f32,
    /// Directory holding the PDFium shared library. Searched before the
    /// system library path.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            pdfium_library_dir: None,
        }
    }
}

/// Relative JPEG quality per recompression band, in `(0, 1]`.
///
/// These are encoder quality levels, not file-size targets: the achieved
/// compression ratio depends entirely on the embedded images.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityBands {
    pub low: f32,
    pub medium: f32,
    pub high: f32,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            low: 0.6,
            medium: 0.4,
            high: 0.25,
        }
    }
}

impl QualityBands {
    /// Quality for `band`.
    pub fn quality(&self, band: QualityBand) -> f32 {
        match band {
            QualityBand::Low => self.low,
            QualityBand::Medium => self.medium,
            QualityBand::High => self.high,
        }
    }
}

/// Watermark appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Standard font names tried in order; the first one with built-in
    /// metrics is used, Helvetica when none match.
    pub font_fallback: Vec<String>,
    /// Fill colour, RGB components in `[0, 1]`.
    pub color: [f32; 3],
    /// Fill opacity in `[0, 1]`.
    pub opacity: f32,
    /// Distance from the page edge for corner positions, in points.
    pub margin: f32,
    pub min_font_size: f32,
    /// Font size is `max(min_font_size, min(width, height) / font_size_divisor)`.
    pub font_size_divisor: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_fallback: vec!["Helvetica".to_string(), "Courier".to_string()],
            color: [0.0, 0.0, 0.0],
            opacity: 100.0 / 255.0,
            margin: 20.0,
            min_font_size: 14.0,
            font_size_divisor: 18.0,
        }
    }
}

impl AppConfig {
    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        info!(path = %path.as_ref().display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from `PDFMASTER_CONFIG` when set (defaults otherwise), then apply
    /// the `PORT` override.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };
        if let Ok(port) = std::env::var(PORT_ENV) {
            config.server.port = port.parse().map_err(|_| PdfMasterError::InvalidParameter {
                name: "PORT",
                reason: format!("'{port}' is not a valid port"),
            })?;
        }
        Ok(config)
    }

    /// Reject values the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        let bands = [
            ("quality_bands.low", self.quality_bands.low),
            ("quality_bands.medium", self.quality_bands.medium),
            ("quality_bands.high", self.quality_bands.high),
        ];
        for (name, value) in bands {
            if !(value > 0.0 && value <= 1.0) {
                return Err(PdfMasterError::InvalidParameter {
                    name,
                    reason: format!("{value} is outside (0, 1]"),
                });
            }
        }
        if !(self.raster.scale > 0.0) {
            return Err(PdfMasterError::InvalidParameter {
                name: "raster.scale",
                reason: "must be positive".into(),
            });
        }
        if !(self.derasterize_dpi > 0.0) {
            return Err(PdfMasterError::InvalidParameter {
                name: "derasterize_dpi",
                reason: "must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(PdfMasterError::InvalidParameter {
                name: "watermark.opacity",
                reason: "must be within [0, 1]".into(),
            });
        }
        let sizes = [
            ("watermark.min_font_size", self.watermark.min_font_size),
            ("watermark.font_size_divisor", self.watermark.font_size_divisor),
        ];
        for (name, value) in sizes {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PdfMasterError::InvalidParameter {
                    name,
                    reason: format!("{value} must be a positive number"),
                });
            }
        }
        if !(self.watermark.margin >= 0.0 && self.watermark.margin.is_finite()) {
            return Err(PdfMasterError::InvalidParameter {
                name: "watermark.margin",
                reason: "must not be negative".into(),
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            raster: RasterConfig::default(),
            derasterize_dpi: 300.0,
            quality_bands: QualityBands::default(),
            watermark: WatermarkConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.raster.scale, 2.0);
        assert_eq!(config.derasterize_dpi, 300.0);
        assert_eq!(config.quality_bands.quality(QualityBand::Low), 0.6);
        assert_eq!(config.quality_bands.quality(QualityBand::Medium), 0.4);
        assert_eq!(config.quality_bands.quality(QualityBand::High), 0.25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"server": {"port": 9100}, "watermark": {"opacity": 0.5}}"#)
                .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(config.watermark.opacity, 0.5);
        assert_eq!(config.watermark.margin, 20.0);
        assert_eq!(config.derasterize_dpi, 300.0);
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let mut config = AppConfig::default();
        config.quality_bands.high = 0.0;
        assert!(config.validate().is_err());
        config.quality_bands.high = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_watermark_sizing_is_rejected() {
        let mut config = AppConfig::default();
        config.watermark.font_size_divisor = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.watermark.min_font_size = -2.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.watermark.margin = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdfmaster.json");
        std::fs::write(&path, r#"{"raster": {"scale": 3.0}}"#).unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.raster.scale, 3.0);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdfmaster.json");
        std::fs::write(&path, r#"{"derasterize_dpi": -1.0}"#).unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }
}
