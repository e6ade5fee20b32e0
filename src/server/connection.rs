//! Per-connection and per-request handling
//!
//! Each accepted connection runs in its own task and is counted against the
//! optional connection cap. Every request is bridged from hyper into a
//! [`RequestContext`], pushed through a snapshot of the pipeline, and the
//! accumulated response is finalized back into a hyper response. Handler
//! errors stop at this boundary: the client sees a generic 500, the detail
//! goes to the logger.

use crate::config::ServerConfig;
use crate::http::context::RequestContext;
use crate::http::request::{ConnectionInfo, IncomingRequest};
use crate::http::response::OutgoingResponse;
use crate::logger::Logger;
use crate::pipeline::Pipeline;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;

/// State shared between the server handle and its accept loop
pub(super) struct SharedState {
    pub(super) config: ServerConfig,
    pub(super) pipeline: RwLock<Pipeline>,
    pub(super) connections: AtomicUsize,
    pub(super) logger: Arc<dyn Logger>,
}

impl SharedState {
    /// Clone the pipeline for one request; registrations made after this
    /// point only affect later requests
    pub(super) fn pipeline_snapshot(&self) -> Pipeline {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Count and dispatch one accepted connection.
///
/// The counter is incremented before the limit check so two racing accepts
/// cannot both slip under the cap; a rejected connection rolls the counter
/// back and is dropped without a response.
pub(super) fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    shared: &Arc<SharedState>,
) {
    let prev_count = shared.connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max) = shared.config.max_connections {
        if prev_count >= usize::try_from(max).unwrap_or(usize::MAX) {
            shared.connections.fetch_sub(1, Ordering::SeqCst);
            shared.logger.warn(&format!(
                "connection limit reached ({prev_count}/{max}), rejecting {peer_addr}"
            ));
            drop(stream);
            return;
        }
    }

    serve_connection(stream, peer_addr, Arc::clone(shared));
}

fn serve_connection(stream: TcpStream, peer_addr: SocketAddr, shared: Arc<SharedState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        // Keep-alive stays on unless explicitly configured off
        let keep_alive = shared.config.keep_alive_timeout != Some(0);
        let idle_limit = shared.config.timeout.map(Duration::from_millis);

        let mut builder = http1::Builder::new();
        builder.keep_alive(keep_alive);

        let service_shared = Arc::clone(&shared);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handle_request(req, peer_addr, Arc::clone(&service_shared))),
        );

        let served = match idle_limit {
            Some(limit) => match tokio::time::timeout(limit, conn).await {
                Ok(result) => result,
                Err(_) => {
                    shared.logger.warn(&format!(
                        "connection from {peer_addr} timed out after {}ms",
                        limit.as_millis()
                    ));
                    Ok(())
                }
            },
            None => conn.await,
        };

        if let Err(err) = served {
            shared
                .logger
                .debug(&format!("connection from {peer_addr} ended: {err}"));
        }

        shared.connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Bridge one hyper request through the pipeline and back.
///
/// Never returns a transport error: every failure mode is translated into an
/// HTTP response so the connection stays usable.
async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    shared: Arc<SharedState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let logger = shared.logger.child("request");
    let (parts, body) = req.into_parts();

    let conn = ConnectionInfo {
        peer_addr: Some(peer_addr),
        encrypted: false,
    };
    let mut request = IncomingRequest::from_hyper(&parts, conn);

    match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            if !bytes.is_empty() {
                if request.is_json() {
                    request.body = serde_json::from_slice(&bytes).ok();
                }
                request.raw_body = Some(bytes);
            }
        }
        Err(err) => {
            logger.warn(&format!("failed to read request body: {err}"));
            let mut response = OutgoingResponse::new();
            response.status(400).json(json!({"error": "Bad Request"}));
            response.end();
            return Ok(finalized_or_fallback(&mut response));
        }
    }

    let pipeline = shared.pipeline_snapshot();
    let mut ctx = RequestContext::new(request);

    match pipeline.execute(&mut ctx).await {
        Ok(()) => {
            if let Some(result) = ctx.result.take() {
                if !ctx.response.has_responded() {
                    ctx.response.json(result);
                }
            }
        }
        Err(err) => {
            logger.error(&format!(
                "{} {} failed: {err}",
                ctx.request.method, ctx.request.path
            ));
            if !ctx.response.has_responded() {
                ctx.response
                    .status(500)
                    .json(json!({"error": "Internal Server Error"}));
            }
        }
    }

    ctx.response.end();
    Ok(finalized_or_fallback(&mut ctx.response))
}

fn finalized_or_fallback(response: &mut OutgoingResponse) -> Response<Full<Bytes>> {
    response.take_finalized().unwrap_or_else(|| {
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
