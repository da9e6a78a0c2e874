// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TCP listener and accept loop.
//
// Each connection gets its own task and carries exactly one request. Every
// request runs inside a span tagged with a fresh request id.

use std::net::SocketAddr;
use std::sync::Arc;

use pdfmaster_core::error::{ErrorKind, PdfMasterError, Result};
use pdfmaster_core::failure::Failure;
use pdfmaster_document::TransformEngine;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::http::{RequestError, read_request};
use crate::routes::{Router, failure_response, with_cors};

/// The HTTP front end, bound and ready to serve.
pub struct ApiServer {
    listener: TcpListener,
    router: Arc<Router>,
    max_upload_bytes: usize,
    shutdown: Arc<Notify>,
}

impl ApiServer {
    /// Bind to the host and port in the engine's configuration.
    pub async fn bind(engine: TransformEngine) -> Result<Self> {
        let server = &engine.config().server;
        let bind_addr = format!("{}:{}", server.host, server.port);
        let max_upload_bytes = server.max_upload_bytes;

        let listener = TcpListener::bind(&bind_addr).await.map_err(|err| {
            PdfMasterError::Io(std::io::Error::new(
                err.kind(),
                format!("bind {bind_addr}: {err}"),
            ))
        })?;
        info!(addr = %bind_addr, rasterizer = engine.has_rasterizer(), "PDFMaster API listening");

        Ok(Self {
            listener,
            router: Arc::new(Router::new(engine)),
            max_upload_bytes,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// The address actually bound (useful when the configured port is 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that stops the accept loop when notified.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Accept connections until the shutdown handle is notified. Requests
    /// already in flight run to completion.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Accept loop received shutdown signal");
                    break;
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let router = Arc::clone(&self.router);
                            let max_upload_bytes = self.max_upload_bytes;
                            tokio::spawn(async move {
                                handle_connection(stream, peer, router, max_upload_bytes).await;
                            });
                        }
                        Err(err) => {
                            error!(error = %err, "Failed to accept connection");
                        }
                    }
                }
            }
        }
    }
}

/// Read one request, answer it, close.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    router: Arc<Router>,
    max_upload_bytes: usize,
) {
    let request_id = Uuid::new_v4();
    let span = info_span!("request", id = %request_id, peer = %peer);

    async move {
        let response = match read_request(&mut stream, max_upload_bytes).await {
            Ok(Some(request)) => {
                info!(method = %request.method, path = %request.path, bytes = request.body.len(), "Request received");
                router.handle(request).await
            }
            Ok(None) => {
                debug!("Connection closed without a request");
                return;
            }
            Err(RequestError::Io(err)) => {
                warn!(error = %err, "Connection error while reading request");
                return;
            }
            Err(err @ RequestError::TooLarge { .. }) => with_cors(failure_response(
                Failure::new(ErrorKind::InputError, err.to_string()).with_status(413),
            )),
            Err(err @ RequestError::LengthRequired) => with_cors(failure_response(
                Failure::new(ErrorKind::InputError, err.to_string()).with_status(411),
            )),
            Err(err @ RequestError::Malformed(_)) => with_cors(failure_response(Failure::new(
                ErrorKind::InputError,
                err.to_string(),
            ))),
        };

        let status = response.status;
        match response.write_to(&mut stream).await {
            Ok(()) => info!(status, bytes = response.body.len(), "Response sent"),
            Err(err) => warn!(error = %err, status, "Failed to write response"),
        }
    }
    .instrument(span)
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfmaster_core::config::AppConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn start(max_upload_bytes: usize) -> (SocketAddr, Arc<Notify>) {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.server.max_upload_bytes = max_upload_bytes;

        let server = ApiServer::bind(TransformEngine::new(config)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        tokio::spawn(server.run());
        (addr, shutdown)
    }

    async fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).to_string()
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        let (addr, shutdown) = start(1024).await;
        let response = exchange(addr, b"GET / HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("PDFMaster Pro API"));
        shutdown.notify_one();
    }

    #[tokio::test]
    async fn oversized_upload_gets_413() {
        let (addr, shutdown) = start(1024).await;
        let response = exchange(
            addr,
            b"POST /api/merge HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=x\r\nContent-Length: 999999\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.contains("\"error\":true"));
        shutdown.notify_one();
    }

    #[tokio::test]
    async fn garbage_gets_400() {
        let (addr, shutdown) = start(1024).await;
        let response = exchange(addr, b"nonsense\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        shutdown.notify_one();
    }
}
