//! Gateway path parsing
//!
//! `/<namespace>/<identifier>[/<segment>]*` becomes a root identifier plus decoded segments.

use crate::error::GatewayError;
use crate::identifier::ContentIdentifier;

/// Parsed request path: root identifier and ordered sub-path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPath {
    pub identifier: ContentIdentifier,
    pub segments: Vec<String>,
}

impl GatewayPath {
    /// Parse a raw (still percent-encoded) request path
    pub fn parse(raw: &str, namespace: &str) -> Result<Self, GatewayError> {
        let mut components = raw.split('/').filter(|c| !c.is_empty());

        match components.next() {
            Some(ns) if ns == namespace => {}
            _ => {
                return Err(GatewayError::InvalidPath(format!(
                    "'{raw}' is not under /{namespace}/"
                )))
            }
        }

        let identifier = components.next().unwrap_or_default().parse::<ContentIdentifier>()?;

        let segments = components
            .map(|c| {
                urlencoding::decode(c)
                    .map(std::borrow::Cow::into_owned)
                    .map_err(|_| GatewayError::InvalidPath(format!("segment '{c}' is not valid UTF-8")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            identifier,
            segments,
        })
    }

    /// Same root, with the last segment replaced
    pub fn with_last_segment(&self, segment: String) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => *last = segment,
            None => segments.push(segment),
        }
        Self {
            identifier: self.identifier,
            segments,
        }
    }

    /// Name of the addressed node, if the path has segments
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Canonical `/<namespace>/<cid>/<segments>` form, segments unencoded
    pub fn display(&self, namespace: &str) -> String {
        let mut out = format!("/{namespace}/{}", self.identifier);
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}
