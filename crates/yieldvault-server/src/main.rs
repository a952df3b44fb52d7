use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yieldvault_server::clock::SystemClock;
use yieldvault_server::config::{ServerConfig, StoreBackend};
use yieldvault_server::store::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use yieldvault_server::{create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,yieldvault_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration")?;

    let store: Arc<dyn LedgerStore> = match config.store {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url, config.max_connections)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Running migrations...");
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(PgLedgerStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; all state is lost on restart");
            Arc::new(MemoryLedgerStore::new())
        }
    };

    let state = AppState::new(store, Arc::new(SystemClock), config.sweep)?;
    let scheduler = state.scheduler.clone();
    scheduler.start();

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
