//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality: content types, ranges, cache
//! validation and response bodies. Nothing here knows about content resolution.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::parse_range_header;
pub use response::{
    build_404_response, build_405_response, build_health_response, build_options_response,
    into_hyper_response, GatewayBody,
};
