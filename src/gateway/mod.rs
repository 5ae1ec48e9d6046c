//! Gateway core
//!
//! A request path goes through [`GatewayPath::parse`], then the [`Resolver`] (with the
//! optional `.html` fallback), then the [`ResponseBuilder`]. Errors from any stage are
//! mapped to a status code by [`Gateway::handle`].

mod builder;
mod listing;
mod path;
mod resolver;

pub use builder::{slice_body, ResponseBuilder, X_IPFS_PATH};
pub use listing::render_listing;
pub use path::GatewayPath;
pub use resolver::{find_entry, Resolver};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::cache::CachePolicy;
use crate::store::{ByteStream, ContentStore};
use bytes::Bytes;
use futures::future::ready;
use futures::stream::{self, StreamExt};
use hyper::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use std::fmt;
use std::sync::Arc;

/// Request details the builder needs beyond the path
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub range: Option<String>,
}

/// Status, headers and an optional streamed body
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<ByteStream>,
}

impl GatewayResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Plain-text error response. The message is the error's display form.
    pub fn error(err: &GatewayError) -> Self {
        let message = format!("{err}\n");
        let mut response = Self::new(err.status());
        response.set_static(CONTENT_TYPE, "text/plain; charset=utf-8");
        response.set(CACHE_CONTROL, "no-cache");
        response.headers.insert(CONTENT_LENGTH, HeaderValue::from(message.len()));
        response.body = Some(stream::once(ready(Ok(Bytes::from(message)))).boxed());
        response
    }

    /// Header value as a string, if present and visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub(crate) fn set_static(&mut self, name: HeaderName, value: &'static str) {
        self.headers.insert(name, HeaderValue::from_static(value));
    }

    /// Insert a header, skipping values that are not valid header text
    pub(crate) fn set(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(_) => tracing::warn!(header = %name, "dropping invalid header value"),
        }
    }
}

impl fmt::Debug for GatewayResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Parser, resolver and builder bound to one store
pub struct Gateway<S: ?Sized> {
    resolver: Resolver<S>,
    builder: ResponseBuilder,
    namespace: String,
    html_fallback: bool,
}

impl<S> Gateway<S>
where
    S: ContentStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: &GatewayConfig) -> Self {
        let cache_policy = if config.cache_max_age == 0 {
            CachePolicy::NoCache
        } else {
            CachePolicy::Immutable(config.cache_max_age)
        };
        Self {
            resolver: Resolver::new(store),
            builder: ResponseBuilder::new(config.namespace.clone(), config.index_files.clone(), cache_policy),
            namespace: config.namespace.clone(),
            html_fallback: config.html_fallback,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether `request_path` is under this gateway's namespace
    pub fn matches(&self, request_path: &str) -> bool {
        request_path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(self.namespace.as_str()))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Parse, resolve and build, surfacing the first error
    pub async fn get_response(
        &self,
        request_path: &str,
        ctx: &RequestContext,
    ) -> Result<GatewayResponse, GatewayError> {
        let path = GatewayPath::parse(request_path, &self.namespace)?;
        let (resolved, node) = self.resolver.resolve_with_fallback(&path, self.html_fallback).await?;
        Ok(self.builder.build(node, &resolved, request_path, ctx))
    }

    /// Like [`Self::get_response`], with errors turned into responses
    pub async fn handle(&self, request_path: &str, ctx: &RequestContext) -> GatewayResponse {
        match self.get_response(request_path, ctx).await {
            Ok(response) => response,
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    tracing::error!(path = request_path, error = %err, "gateway request failed");
                } else {
                    tracing::debug!(path = request_path, status = status.as_u16(), error = %err, "gateway request rejected");
                }
                GatewayResponse::error(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::CidVersion;
    use crate::store::{collect, AddOptions, AddedContent, DirectoryInput, MemoryStore};
    use futures::TryStreamExt;

    const HOLMES: &str = "To Sherlock Holmes she is always the woman.";
    const PP: &str = "It is a truth universally acknowledged.";

    fn config() -> GatewayConfig {
        GatewayConfig::default()
    }

    async fn add_dir(store: &MemoryStore, files: &[(&str, &'static str)], version: CidVersion) -> AddedContent {
        let inputs = files
            .iter()
            .map(|(path, content)| DirectoryInput {
                path: (*path).to_string(),
                content: Bytes::from_static(content.as_bytes()),
            })
            .collect();
        let added: Vec<AddedContent> = store
            .add_directory(inputs, AddOptions { cid_version: version })
            .try_collect()
            .await
            .unwrap();
        added.last().unwrap().clone()
    }

    async fn body_of(response: GatewayResponse) -> String {
        String::from_utf8(collect(response.body.unwrap()).await).unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_by_cidv0_and_cidv1() {
        for version in [CidVersion::V0, CidVersion::V1] {
            let store = Arc::new(MemoryStore::default());
            let file = store
                .add_content(Bytes::from_static(b"hello world"), AddOptions { cid_version: version })
                .await
                .unwrap();
            let gateway = Gateway::new(store, &config());

            let res = gateway
                .get_response(&format!("/ipfs/{}", file.identifier), &RequestContext::default())
                .await
                .unwrap();
            assert_eq!(res.status, StatusCode::OK);
            assert_eq!(body_of(res).await, "hello world");
        }
    }

    #[tokio::test]
    async fn test_directory_listing_and_entries() {
        let store = Arc::new(MemoryStore::default());
        let root = add_dir(&store, &[("test-folder/holmes.txt", HOLMES), ("test-folder/pp.txt", PP)], CidVersion::V0).await;
        let gateway = Gateway::new(store, &config());
        let base = format!("/ipfs/{}", root.identifier);

        let listing = gateway.get_response(&base, &RequestContext::default()).await.unwrap();
        assert_eq!(listing.status, StatusCode::OK);
        assert_eq!(listing.header("content-type"), Some("text/html; charset=utf-8"));
        let html = body_of(listing).await;
        assert!(html.contains("<html>"));

        for (name, content) in [("holmes.txt", HOLMES), ("pp.txt", PP)] {
            assert!(html.contains(name));
            let res = gateway
                .get_response(&format!("{base}/{name}"), &RequestContext::default())
                .await
                .unwrap();
            assert_eq!(res.status, StatusCode::OK);
            assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
            assert_eq!(body_of(res).await, content);
        }
    }

    #[tokio::test]
    async fn test_index_html_redirect() {
        let store = Arc::new(MemoryStore::default());
        let root = add_dir(
            &store,
            &[("site/index.html", "<h1>home</h1>"), ("site/pp.txt", PP)],
            CidVersion::V1,
        )
        .await;
        let gateway = Gateway::new(store, &config());
        let base = format!("/ipfs/{}", root.identifier);

        let res = gateway.get_response(&base, &RequestContext::default()).await.unwrap();
        assert_eq!(res.status, StatusCode::FOUND);
        let location = res.header("location").unwrap().to_string();
        assert_eq!(location, format!("{base}/index.html"));

        let index = gateway.get_response(&location, &RequestContext::default()).await.unwrap();
        assert_eq!(index.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(body_of(index).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_mime_types() {
        let store = Arc::new(MemoryStore::default());
        let root = add_dir(
            &store,
            &[
                ("m/a.txt", "t"),
                ("m/b.html", "h"),
                ("m/c.htm", "h"),
                ("m/d.jpg", "j"),
                ("m/e.JPEG", "j"),
                ("m/f.svg", "s"),
                ("m/noext", "x"),
            ],
            CidVersion::V1,
        )
        .await;
        let gateway = Gateway::new(store, &config());

        let expected = [
            ("a.txt", "text/plain; charset=utf-8"),
            ("b.html", "text/html; charset=utf-8"),
            ("c.htm", "text/html; charset=utf-8"),
            ("d.jpg", "image/jpeg"),
            ("e.JPEG", "image/jpeg"),
            ("f.svg", "image/svg+xml"),
            ("noext", "application/octet-stream"),
        ];
        for (name, content_type) in expected {
            let res = gateway
                .get_response(&format!("/ipfs/{}/{name}", root.identifier), &RequestContext::default())
                .await
                .unwrap();
            assert_eq!(res.header("content-type"), Some(content_type), "{name}");
        }
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let store = Arc::new(MemoryStore::default());
        let file = store
            .add_content(Bytes::from_static(b"leaf"), AddOptions::default())
            .await
            .unwrap();
        let gateway = Gateway::new(store, &config());
        let ctx = RequestContext::default();

        let past_file = gateway.handle(&format!("/ipfs/{}/extra", file.identifier), &ctx).await;
        assert_eq!(past_file.status, StatusCode::NOT_FOUND);

        let missing_root = gateway
            .handle("/ipfs/bafkreidffqfydlguosmmyebv5rp72m45tbpbq6segnkosa45kjfnduix6u", &ctx)
            .await;
        assert_eq!(missing_root.status, StatusCode::NOT_FOUND);
        assert_eq!(missing_root.header("cache-control"), Some("no-cache"));
        let message = String::from_utf8(collect(missing_root.body.unwrap()).await).unwrap();
        assert!(message.starts_with("content not found: "), "{message}");

        let bad_cid = gateway.handle("/ipfs/not-a-cid", &ctx).await;
        assert_eq!(bad_cid.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad_cid.header("cache-control"), Some("no-cache"));

        let no_cid = gateway.handle("/ipfs/", &ctx).await;
        assert_eq!(no_cid.status, StatusCode::BAD_REQUEST);

        let wrong_namespace = gateway.handle(&format!("/ipns/{}", file.identifier), &ctx).await;
        assert_eq!(wrong_namespace.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_range_and_conditional_requests() {
        let store = Arc::new(MemoryStore::new(4));
        let file = store
            .add_content(Bytes::from_static(b"0123456789"), AddOptions::default())
            .await
            .unwrap();
        let gateway = Gateway::new(store, &config());
        let path = format!("/ipfs/{}", file.identifier);

        let ranged = gateway
            .get_response(
                &path,
                &RequestContext {
                    range: Some("bytes=2-4".to_string()),
                    ..RequestContext::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ranged.status, StatusCode::PARTIAL_CONTENT);
        let etag = ranged.header("etag").unwrap().to_string();
        assert_eq!(body_of(ranged).await, "234");

        let cached = gateway
            .get_response(
                &path,
                &RequestContext {
                    if_none_match: Some(etag),
                    ..RequestContext::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cached.status, StatusCode::NOT_MODIFIED);
        assert!(cached.body.is_none());
    }

    #[tokio::test]
    async fn test_head_and_percent_encoded_segments() {
        let store = Arc::new(MemoryStore::default());
        let root = add_dir(&store, &[("d/my notes.txt", PP)], CidVersion::V1).await;
        let gateway = Gateway::new(store, &config());
        let path = format!("/ipfs/{}/my%20notes.txt", root.identifier);

        let head = gateway
            .get_response(
                &path,
                &RequestContext {
                    is_head: true,
                    ..RequestContext::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.header("content-length"), Some(PP.len().to_string().as_str()));
        assert!(head.body.is_none());

        let get = gateway.get_response(&path, &RequestContext::default()).await.unwrap();
        assert_eq!(get.header("x-ipfs-path"), Some(path.as_str()));
        assert_eq!(body_of(get).await, PP);
    }

    #[test]
    fn test_namespace_match() {
        let gateway = Gateway::new(Arc::new(MemoryStore::default()), &config());
        assert!(gateway.matches("/ipfs/abc"));
        assert!(gateway.matches("/ipfs"));
        assert!(!gateway.matches("/ipfsx/abc"));
        assert!(!gateway.matches("/healthz"));
    }
}
