//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use super::AppState;
use crate::gateway::{RequestContext, X_IPFS_PATH};
use crate::http::{self, GatewayBody};
use crate::logger::{self, AccessLogEntry};
use hyper::header::{HeaderValue, CONTENT_LENGTH, IF_NONE_MATCH, RANGE, REFERER, SERVER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<GatewayBody>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let mut response = route_request(&parts, &state).await;

    match HeaderValue::from_str(&state.config.http.server_name) {
        Ok(server) => {
            response.headers_mut().insert(SERVER, server);
        }
        Err(_) => logger::log_warning("http.server_name is not a valid header value"),
    }

    if state.config.logging.access_log {
        let entry = access_entry(&parts, &response, remote_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request(req: &Parts, state: &AppState) -> Response<GatewayBody> {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(&req.method, state.config.http.enable_cors) {
        return resp;
    }

    let path = req.uri.path();

    // 2. Health check endpoints (highest priority, always fast)
    let health = &state.config.health;
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return http::build_health_response("ok");
    }

    // 3. Gateway namespace
    if state.gateway.matches(path) {
        let ctx = request_context(&req.method, &req.headers);
        let mut response = state.gateway.handle(path, &ctx).await;
        if ctx.is_head {
            response.body = None;
        }
        return http::into_hyper_response(response);
    }

    http::build_404_response()
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<GatewayBody>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Extract the headers the gateway uses for caching and range requests
fn request_context(method: &Method, headers: &HeaderMap) -> RequestContext {
    RequestContext {
        is_head: *method == Method::HEAD,
        if_none_match: header_string(headers, IF_NONE_MATCH.as_str()),
        range: header_string(headers, RANGE.as_str()),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn access_entry(
    req: &Parts,
    response: &Response<GatewayBody>,
    remote_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method.to_string(),
        req.uri.path().to_string(),
    );
    entry.query = req.uri.query().map(ToString::to_string);
    entry.http_version = match req.version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = header_string(response.headers(), CONTENT_LENGTH.as_str())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.referer = header_string(&req.headers, REFERER.as_str());
    entry.user_agent = header_string(&req.headers, USER_AGENT.as_str());
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry.content_path = header_string(response.headers(), X_IPFS_PATH.as_str());
    entry
}
