//! Application setup: tracing, database, storage backend and routes

pub mod routes;
pub mod server;

use crate::state::AppState;
use axum::Router;
use offload_core::{Config, EncryptionService};
use offload_db::{setup_database, PgFileRepository};
use offload_services::CloudStorage;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` filters (default `info`), `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Connect the database, build the configured backend and the router.
pub async fn initialize_app(config: &Config) -> anyhow::Result<(Arc<AppState>, Router)> {
    let pool = setup_database(config.database_url()?).await?;
    let files = Arc::new(PgFileRepository::new(pool));

    let cipher = EncryptionService::from_env()?;
    tracing::info!(
        storage = %serde_json::to_string(&config.storage.masked())?,
        "Cloud storage configuration"
    );

    let cloud = CloudStorage::from_config(config, files, cipher.as_ref(), None)?;
    let state = Arc::new(AppState::new(cloud));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
