//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method checks, dispatch to the
//! endpoint handlers and access logging.

use crate::config::AppState;
use crate::handler::{assets, list, upload};
use crate::http::{self, query, Body};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request metadata the handlers need, detached from the body
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    /// Decoded `path` query parameter; empty when absent
    pub target: String,
    pub is_head: bool,
    pub content_type: Option<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub if_range: Option<String>,
    pub range_header: Option<String>,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            target: query::query_param(parts.uri.query(), "path").unwrap_or_default(),
            is_head: parts.method == Method::HEAD,
            content_type: header("content-type"),
            if_none_match: header("if-none-match"),
            if_modified_since: header("if-modified-since"),
            if_range: header("if-range"),
            range_header: header("range"),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Generic over the request body so it can be driven by hyper's `Incoming` in
/// the server and by in-memory bodies in tests.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Body>, Infallible>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let ctx = RequestContext::from_parts(&parts);

    let response = route_request(&ctx, body, &state).await;

    if state.access_log() {
        log_access(&parts, &response, peer_addr, started, &state);
    }
    Ok(response)
}

async fn route_request<B>(
    ctx: &RequestContext,
    body: B,
    state: &AppState,
) -> Response<Body>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match (ctx.path.as_str(), &ctx.method) {
        ("/list", &Method::GET | &Method::HEAD) => list::handle_list(ctx, state).await,
        ("/list", _) => reject_method(ctx, "GET, HEAD"),
        ("/upload", &Method::POST) => upload::handle_upload(ctx, body, state).await,
        ("/upload", _) => reject_method(ctx, "POST"),
        (_, &Method::GET | &Method::HEAD) => assets::serve_asset(ctx),
        _ => reject_method(ctx, "GET, HEAD"),
    }
}

fn reject_method(ctx: &RequestContext, allow: &str) -> Response<Body> {
    logger::log_warning(&format!("Method not allowed: {} {}", ctx.method, ctx.path));
    http::build_405_response(allow)
}

fn log_access(
    parts: &Parts,
    response: &Response<Body>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = match parts.version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}
