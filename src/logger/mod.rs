//! Logger module
//!
//! Provides logging utilities for the gateway including:
//! - Subscriber setup from the logging config
//! - Server lifecycle logging
//! - Access logging with multiple formats, optionally to a file

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::fs::{File, OpenOptions};
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Target of access log events
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber with configuration
///
/// Should be called once at application startup. `RUST_LOG` overrides
/// `logging.level` when set.
pub fn init(config: &Config) -> std::io::Result<()> {
    let logging = &config.logging;
    let access_file = logging.access_log_file.as_deref().map(open_log_file).transpose()?;
    let to_file = access_file.is_some();

    let console = fmt::layer()
        .with_target(false)
        .with_filter(build_filter(logging))
        .with_filter(filter_fn(move |meta| !(to_file && meta.target() == ACCESS_TARGET)));

    let access = access_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .without_time()
            .with_level(false)
            .with_target(false)
            .with_filter(filter_fn(|meta| meta.target() == ACCESS_TARGET))
    });

    tracing_subscriber::registry()
        .with(console)
        .with(access)
        .try_init()
        .map_err(std::io::Error::other)
}

/// Console filter: `RUST_LOG`, else `logging.level`, with access events on or off
fn build_filter(logging: &LoggingConfig) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let access_level = if logging.access_log { "info" } else { "off" };
    match format!("{ACCESS_TARGET}={access_level}").parse() {
        Ok(directive) => base.add_directive(directive),
        Err(_) => base,
    }
}

fn open_log_file(path: &str) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("Gateway started, listening on http://{addr}");
    tracing::info!(
        namespace = %config.gateway.namespace,
        index_files = ?config.gateway.index_files,
        html_fallback = config.gateway.html_fallback,
        "Serving /{}/<cid>",
        config.gateway.namespace
    );
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        tracing::info!("Max connections: {max}");
    }
    if let Some(ref path) = config.logging.access_log_file {
        tracing::info!("Access log: {path}");
    }
}

pub fn log_seeded(path: &str, cid: &impl std::fmt::Display) {
    tracing::info!("[Seed] {path} -> /{cid}");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_connection_rejected(peer_addr: &SocketAddr, limit: u64) {
    tracing::warn!("[Connection] Rejected {peer_addr}: limit of {limit} reached");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_shutdown(active: usize) {
    tracing::info!("[Shutdown] Signal received, waiting for {active} connection(s)");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
