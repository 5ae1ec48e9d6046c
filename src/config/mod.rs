// Configuration module entry point
// Loads layered configuration: file, then environment, then defaults

mod types;

use std::net::SocketAddr;
use std::time::Duration;

// Re-export public types
pub use types::{
    Config, GatewayConfig, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    ServerConfig, StoreConfig,
};

/// Default configuration file, looked up without extension
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Prefix of environment overrides, e.g. `CIDSERVE_SERVER__PORT=9090`
pub const ENV_PREFIX: &str = "CIDSERVE";

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// A missing file is not an error; defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", concat!("cidserve/", env!("CARGO_PKG_VERSION")))?
            .set_default("http.enable_cors", false)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl PerformanceConfig {
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub const fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    pub const fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout)
    }
}
