//! cidserve
//!
//! An HTTP gateway for content-addressed data. Requests of the form
//! `/ipfs/<cid>[/<segment>]*` are parsed, resolved through a [`store::ContentStore`]
//! and answered with the file bytes, a redirect to a directory's index page, or a
//! generated directory listing.

pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod identifier;
pub mod logger;
pub mod server;
pub mod store;
