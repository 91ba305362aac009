use std::sync::Arc;

use anyhow::Context;
use shelfmark_core::Extractor;
use shelfmark_server::{MemoryStore, PgStore, ServerConfig, Store, StoreBackend, build_app};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shelfmark_server=info,shelfmark_core=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match &config.store {
        StoreBackend::Postgres { url, pool_size } => {
            Arc::new(PgStore::connect(url, *pool_size).context("failed to set up database pool")?)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    store.ensure_schema().await.context("failed to prepare database schema")?;

    let extractor = Arc::new(Extractor::new(config.extractor_config()));
    let app = build_app(store, extractor, &config);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "shelfmark server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
