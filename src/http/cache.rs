//! HTTP cache control module
//!
//! Content-addressed responses never change, so the `ETag` is the identifier itself.

use crate::identifier::ContentIdentifier;

/// Quoted `ETag` for a node, e.g. `"bafy..."`
///
/// The canonical form is used so every spelling of the same content shares one tag.
pub fn generate_etag(identifier: &ContentIdentifier) -> String {
    format!("\"{}\"", identifier.canonical())
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Weak validators: `W/"abc123"`
/// - Wildcard: `*`
///
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public, never revalidated (content-addressed responses)
    Immutable(u32),
    /// No cache
    NoCache,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Immutable(max_age) => format!("public, max-age={max_age}, immutable"),
            Self::NoCache => "no-cache".to_string(),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Immutable(29_030_400) // 48 weeks
    }
}
