//! HTTP response building module
//!
//! Converts gateway responses into hyper responses and provides builders for the
//! front end's own status code responses.

use crate::gateway::GatewayResponse;
use crate::store::{ByteStream, StoreError};
use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;

/// Response body: a fixed buffer or a store stream read on demand
pub type GatewayBody = UnsyncBoxBody<Bytes, StoreError>;

pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

pub fn full_body(data: impl Into<Bytes>) -> GatewayBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed_unsync()
}

pub fn empty_body() -> GatewayBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// Frames are pulled from the stream only when hyper polls for them, and dropping
/// the body drops the stream.
pub fn stream_body(stream: ByteStream) -> GatewayBody {
    StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
}

/// Convert a gateway response, keeping its status and headers
pub fn into_hyper_response(response: GatewayResponse) -> Response<GatewayBody> {
    let body = response.body.map_or_else(empty_body, stream_body);
    let mut hyper_response = Response::new(body);
    *hyper_response.status_mut() = response.status;
    *hyper_response.headers_mut() = response.headers;
    hyper_response
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<GatewayBody> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .body(full_body("404 Not Found"))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body("404 Not Found"))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<GatewayBody> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", ALLOWED_METHODS)
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<GatewayBody> {
    let mut builder = Response::builder().status(204).header("Allow", ALLOWED_METHODS);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
            .header("Access-Control-Allow-Headers", "Content-Type, Range, If-None-Match")
            .header(
                "Access-Control-Expose-Headers",
                "Content-Range, Content-Length, ETag, X-Ipfs-Path",
            )
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(empty_body()).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(empty_body())
    })
}

/// Build health check response
pub fn build_health_response(status: &'static str) -> Response<GatewayBody> {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache")
        .body(full_body(status))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(full_body(status))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};
    use hyper::StatusCode;

    async fn body_bytes(response: Response<GatewayBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_stream_body_is_forwarded() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let mut gateway = GatewayResponse::new(StatusCode::OK);
        gateway.headers.insert("etag", "\"x\"".parse().unwrap());
        gateway.body = Some(stream::iter(chunks).boxed());

        let response = into_hyper_response(gateway);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["etag"], "\"x\"");
        assert_eq!(body_bytes(response).await, "abcd");
    }

    #[tokio::test]
    async fn test_stream_error_surfaces() {
        let chunks = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(StoreError::Backend("disk gone".to_string())),
        ];
        let mut gateway = GatewayResponse::new(StatusCode::OK);
        gateway.body = Some(stream::iter(chunks).boxed());

        let result = into_hyper_response(gateway).into_body().collect().await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_missing_body_is_empty() {
        let response = into_hyper_response(GatewayResponse::new(StatusCode::FOUND));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[test]
    fn test_options_cors_headers() {
        let plain = build_options_response(false);
        assert_eq!(plain.status(), StatusCode::NO_CONTENT);
        assert!(plain.headers().get("access-control-allow-origin").is_none());

        let cors = build_options_response(true);
        assert_eq!(cors.headers()["access-control-allow-origin"], "*");
        assert_eq!(cors.headers()["allow"], ALLOWED_METHODS);
    }

    #[test]
    fn test_status_builders() {
        assert_eq!(build_404_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(build_405_response().status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(build_health_response("ok").status(), StatusCode::OK);
    }
}
