//! Request handler module
//!
//! Responsible for request routing dispatch: health probes, the gateway namespace,
//! and everything else.

pub mod router;

use crate::config::Config;
use crate::gateway::Gateway;
use crate::store::ContentStore;
use std::sync::Arc;

// Re-export main entry point
pub use router::handle_request;

/// Shared, read-only state for every connection
pub struct AppState {
    pub config: Config,
    pub gateway: Gateway<dyn ContentStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ContentStore>) -> Self {
        let gateway = Gateway::new(store, &config.gateway);
        Self { config, gateway }
    }
}
