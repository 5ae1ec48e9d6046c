use std::path::Path;
use std::sync::Arc;

use cidserve::config::{self, Config};
use cidserve::handler::AppState;
use cidserve::logger;
use cidserve::server;
use cidserve::store::{seed, AddOptions, ContentStore, MemoryStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path, extension optional
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    // Tokio runtime, thread count from the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let store = Arc::new(MemoryStore::new(cfg.store.chunk_size));
    seed_store(store.as_ref(), &cfg).await?;

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, store));
    server::run_server(listener, state, server::shutdown_signal()).await?;
    Ok(())
}

/// Import every configured seed path, failing startup on the first error
async fn seed_store(store: &dyn ContentStore, cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let options = AddOptions {
        cid_version: cfg.store.cid_version,
    };
    for path in &cfg.store.seed_paths {
        let added = seed::import_path(store, Path::new(path), options).await?;
        logger::log_seeded(path, &format!("{}/{}", cfg.gateway.namespace, added.identifier));
    }
    Ok(())
}
