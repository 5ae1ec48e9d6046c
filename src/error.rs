//! Gateway error types
//!
//! Parsing and resolution failures are returned to the request handler, which turns
//! them into status codes via [`GatewayError::status`]. Nothing here is retried.

use crate::fallback::FallbackError;
use crate::identifier::{ContentIdentifier, ParseIdentifierError};
use crate::store::StoreError;
use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The identifier segment is missing or malformed.
    #[error(transparent)]
    InvalidIdentifier(#[from] ParseIdentifierError),

    /// The request path is not a gateway path.
    #[error("invalid gateway path: {0}")]
    InvalidPath(String),

    /// A path segment does not exist under the resolved tree.
    #[error("no link named '{segment}' under {path}")]
    NotFound { path: String, segment: String },

    /// The store holds no object for an identifier, typically the root of the path.
    #[error("content not found: {0}")]
    ContentNotFound(ContentIdentifier),

    /// Fallback executor misuse: no candidates, or a non-invocable one.
    #[error("fallback error: {0}")]
    Fallback(String),

    /// Opaque storage failure.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl GatewayError {
    pub fn not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// HTTP status the request handler answers with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidIdentifier(_) | Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } | Self::ContentNotFound(_) => StatusCode::NOT_FOUND,
            Self::Fallback(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::ContentNotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<FallbackError<Self>> for GatewayError {
    fn from(err: FallbackError<Self>) -> Self {
        match err {
            FallbackError::Failed(e) => e,
            other @ (FallbackError::NoCandidates | FallbackError::InvalidCandidate { .. }) => {
                Self::Fallback(other.to_string())
            }
        }
    }
}
