use anyhow::Context;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use srag_api::app::{app, AppState};
use srag_api::config;
use srag_api::database::{DatabaseManager, PgSragStore};
use srag_api::is_production;
use srag_api::srag::SragService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting SRAG API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is not set; every protected request will be rejected");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    let store = PgSragStore::new(pool);
    store.ensure_schema().await.context("failed to prepare the srag table")?;

    let service = SragService::from_config(Arc::new(store), config);

    if config.ingestion.auto_ingest {
        // Ingestion problems are reported but never keep the API from starting
        match service.init_ingestion_if_empty().await {
            Ok(Some(summary)) => tracing::info!(
                "Initial ingestion inserted {} records from {} files",
                summary.inserted,
                summary.files.len()
            ),
            Ok(None) => {}
            Err(e) => tracing::error!("Initial ingestion failed: {}", e),
        }
    }

    let mut router = app(AppState::new(service, config.security.jwt_secret.as_str()));
    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("SRAG API listening on http://{}", bind_addr);
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
