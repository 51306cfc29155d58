mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use clap::Parser;
use snip_core::ExternalStore;
use snip_engine::ShortenerEngine;
use snip_gateway::{App, AppState};
use snip_storage::{InMemoryStore, MySqlStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        "starting snip http server"
    );

    let store: Arc<dyn ExternalStore> = match config.storage {
        StorageBackendArg::InMemory => Arc::new(InMemoryStore::new()),
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
    };

    let engine = ShortenerEngine::with_shared_store(store, config.engine_config())?;
    let loaded = engine.warm_up().await?;
    info!(loaded, "loaded persisted urls");

    let router = App::router(AppState::new(Arc::new(engine)));
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}
