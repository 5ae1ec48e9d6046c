// Connection handling module
// Accepts a single TCP connection and serves it on its own task

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;

use crate::config::PerformanceConfig;
use crate::handler::{self, AppState};
use crate::logger;

/// Whether another connection fits under `max_connections`, given the count before it
pub fn within_limit(prev_count: usize, max_connections: Option<u64>) -> bool {
    max_connections.map_or(true, |max| prev_count < usize::try_from(max).unwrap_or(usize::MAX))
}

/// HTTP/1 settings derived from the performance config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub keep_alive: bool,
    /// Deadline for a request's headers. On a kept-alive connection this also
    /// bounds the idle wait for the next request.
    pub header_read_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(performance: &PerformanceConfig) -> Self {
        let keep_alive = performance.keep_alive_timeout > 0;
        let header_read_timeout = if keep_alive {
            performance.read_timeout().max(performance.keep_alive_timeout())
        } else {
            performance.read_timeout()
        };
        Self {
            keep_alive,
            header_read_timeout,
        }
    }
}

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `graceful` - Shutdown watcher the connection registers with
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    let max_connections = state.config.performance.max_connections;

    if !within_limit(prev_count, max_connections) {
        conn_counter.fetch_sub(1, Ordering::SeqCst);
        logger::log_connection_rejected(&peer_addr, max_connections.unwrap_or_default());
        drop(stream);
        return;
    }

    logger::log_connection_accepted(&peer_addr);

    // Only header reads are timed; response bodies go at the client's pace
    let settings = ConnectionSettings::from_config(&state.config.performance);
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(settings.keep_alive)
        .header_read_timeout(settings.header_read_timeout);

    let service_state = Arc::clone(state);
    let conn = builder.serve_connection(
        TokioIo::new(stream),
        service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
    );
    let conn = graceful.watch(conn);
    let conn_counter = Arc::clone(conn_counter);

    tokio::spawn(async move {
        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }

        // Decrement active connection counter
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn performance(keep_alive_timeout: u64, read_timeout: u64) -> PerformanceConfig {
        PerformanceConfig {
            keep_alive_timeout,
            read_timeout,
            write_timeout: 1,
            max_connections: None,
        }
    }

    #[test]
    fn test_connection_settings() {
        let settings = ConnectionSettings::from_config(&performance(75, 30));
        assert!(settings.keep_alive);
        assert_eq!(settings.header_read_timeout, Duration::from_secs(75));

        let settings = ConnectionSettings::from_config(&performance(5, 30));
        assert_eq!(settings.header_read_timeout, Duration::from_secs(30));

        let settings = ConnectionSettings::from_config(&performance(0, 10));
        assert!(!settings.keep_alive);
        assert_eq!(settings.header_read_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_within_limit() {
        assert!(within_limit(1_000_000, None));
        assert!(within_limit(0, Some(1)));
        assert!(!within_limit(1, Some(1)));
        assert!(!within_limit(5, Some(0)));
    }
}
