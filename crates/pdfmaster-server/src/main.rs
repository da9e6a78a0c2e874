// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFMaster: document transformation service.
//
// Entry point. Initialises logging, loads configuration, probes the page
// rasterizer, and serves the HTTP API until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use pdfmaster_core::AppConfig;
use pdfmaster_document::{PdfiumRasterizer, TransformEngine};
use pdfmaster_server::ApiServer;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("PDFMaster starting");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = TransformEngine::new(config.clone());
    match PdfiumRasterizer::probe(&config.raster) {
        Ok(rasterizer) => engine = engine.with_rasterizer(Arc::new(rasterizer)),
        Err(e) => {
            tracing::warn!(error = %e, "PDF to image conversion disabled");
        }
    }

    let server = match ApiServer::bind(engine).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start listener");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.notify_one();
        }
    });

    server.run().await;
    tracing::info!("PDFMaster stopped");
    ExitCode::SUCCESS
}
