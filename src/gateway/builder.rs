//! Response builder
//!
//! Turns a resolved node into a [`GatewayResponse`]. Nothing here touches storage: a
//! file's stream is passed through as-is (or sliced for a range), and directory
//! decisions are made from the entries already in hand.

use super::listing::render_listing;
use super::path::GatewayPath;
use super::{GatewayResponse, RequestContext};
use crate::http::cache::{self, CachePolicy};
use crate::http::mime;
use crate::http::range::{parse_range_header, RangeParseResult};
use crate::store::{ByteStream, DirectoryEntry, ResolvedNode};
use bytes::Bytes;
use futures::future::ready;
use futures::stream::{self, StreamExt};
use hyper::header::{
    HeaderName, HeaderValue, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, LOCATION,
};
use hyper::StatusCode;

pub const X_IPFS_PATH: HeaderName = HeaderName::from_static("x-ipfs-path");

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

pub struct ResponseBuilder {
    namespace: String,
    index_files: Vec<String>,
    cache_policy: CachePolicy,
}

impl ResponseBuilder {
    pub const fn new(namespace: String, index_files: Vec<String>, cache_policy: CachePolicy) -> Self {
        Self {
            namespace,
            index_files,
            cache_policy,
        }
    }

    /// Build the response for `node`, which `resolved` points at.
    ///
    /// `request_path` is the raw path the client asked for; it is echoed in
    /// `X-Ipfs-Path` and used as the base of redirects and listing links.
    pub fn build(
        &self,
        node: ResolvedNode,
        resolved: &GatewayPath,
        request_path: &str,
        ctx: &RequestContext,
    ) -> GatewayResponse {
        let mut response = match node {
            ResolvedNode::File {
                identifier,
                size,
                body,
            } => {
                let etag = cache::generate_etag(&identifier);
                let content_type = mime::content_type_for_name(resolved.file_name());
                self.file_response(body, size, content_type, &etag, ctx)
            }
            ResolvedNode::Directory {
                identifier,
                entries,
            } => match self.find_index(&entries) {
                Some(index) => {
                    let mut response = redirect_response(request_path, index);
                    self.set_cache_headers(&mut response, &cache::generate_etag(&identifier));
                    response
                }
                None => {
                    let etag = cache::generate_etag(&identifier);
                    let html = render_listing(
                        request_path,
                        &resolved.display(&self.namespace),
                        &identifier,
                        &entries,
                    );
                    self.listing_response(html, &etag, ctx)
                }
            },
        };

        if let Ok(value) = HeaderValue::from_str(request_path) {
            response.headers.insert(X_IPFS_PATH, value);
        }
        response
    }

    /// First configured index name present in `entries`
    fn find_index<'a>(&'a self, entries: &[DirectoryEntry]) -> Option<&'a str> {
        self.index_files
            .iter()
            .find(|name| entries.iter().any(|e| &e.name == *name))
            .map(String::as_str)
    }

    fn file_response(
        &self,
        body: ByteStream,
        size: u64,
        content_type: &'static str,
        etag: &str,
        ctx: &RequestContext,
    ) -> GatewayResponse {
        if cache::check_etag_match(ctx.if_none_match.as_deref(), etag) {
            return self.not_modified(etag);
        }

        let mut response = GatewayResponse::new(StatusCode::OK);
        response.set_static(CONTENT_TYPE, content_type);
        response.set_static(ACCEPT_RANGES, "bytes");
        self.set_cache_headers(&mut response, etag);

        let body = match parse_range_header(ctx.range.as_deref(), size) {
            RangeParseResult::Valid(range) => {
                let end = range.end_position(size);
                let length = range.content_length(size);
                response.status = StatusCode::PARTIAL_CONTENT;
                response.set(CONTENT_RANGE, &format!("bytes {}-{end}/{size}", range.start));
                response.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
                slice_body(body, range.start, length)
            }
            RangeParseResult::NotSatisfiable => {
                let mut response = GatewayResponse::new(StatusCode::RANGE_NOT_SATISFIABLE);
                response.set(CONTENT_RANGE, &format!("bytes */{size}"));
                return response;
            }
            RangeParseResult::None => {
                response.headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
                body
            }
        };

        if !ctx.is_head {
            response.body = Some(body);
        }
        response
    }

    fn listing_response(&self, html: String, etag: &str, ctx: &RequestContext) -> GatewayResponse {
        if cache::check_etag_match(ctx.if_none_match.as_deref(), etag) {
            return self.not_modified(etag);
        }

        let mut response = GatewayResponse::new(StatusCode::OK);
        response.set_static(CONTENT_TYPE, HTML_CONTENT_TYPE);
        response.headers.insert(CONTENT_LENGTH, HeaderValue::from(html.len()));
        self.set_cache_headers(&mut response, etag);
        if !ctx.is_head {
            response.body = Some(single_chunk(Bytes::from(html)));
        }
        response
    }

    fn not_modified(&self, etag: &str) -> GatewayResponse {
        let mut response = GatewayResponse::new(StatusCode::NOT_MODIFIED);
        self.set_cache_headers(&mut response, etag);
        response
    }

    fn set_cache_headers(&self, response: &mut GatewayResponse, etag: &str) {
        response.set(ETAG, etag);
        response.set(CACHE_CONTROL, &self.cache_policy.to_header_value());
    }
}

fn redirect_response(request_path: &str, index: &str) -> GatewayResponse {
    let location = format!(
        "{}/{}",
        request_path.trim_end_matches('/'),
        urlencoding::encode(index)
    );
    let mut response = GatewayResponse::new(StatusCode::FOUND);
    response.set(LOCATION, &location);
    response
}

fn single_chunk(data: Bytes) -> ByteStream {
    stream::once(ready(Ok(data))).boxed()
}

/// Restrict a byte stream to `length` bytes starting at `start`.
///
/// Chunks before the range are read and dropped. The stream ends as soon as the
/// last byte of the range is sent, without polling the source again.
pub fn slice_body(body: ByteStream, start: u64, length: u64) -> ByteStream {
    stream::unfold((body, start, length), |(mut body, mut skip, remaining)| async move {
        if remaining == 0 {
            return None;
        }
        loop {
            let mut chunk = match body.next().await? {
                Ok(chunk) => chunk,
                Err(e) => return Some((Err(e), (body, skip, 0))),
            };
            let chunk_len = chunk.len() as u64;
            if skip >= chunk_len {
                skip -= chunk_len;
                continue;
            }
            let mut part = chunk.split_off(usize::try_from(skip).unwrap_or(usize::MAX));
            let take = usize::try_from(remaining).unwrap_or(usize::MAX).min(part.len());
            part.truncate(take);
            return Some((Ok(part), (body, 0, remaining - take as u64)));
        }
    })
    .boxed()
}
