use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use offload_core::models::MigrationReport;
use offload_services::ConnectionTestResult;
use serde::Serialize;
use std::sync::Arc;

/// Offload every file still on local disk. Runs to completion before responding.
#[tracing::instrument(skip(state), fields(operation = "migrate_existing_files"))]
pub async fn migrate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MigrationReport>, HttpAppError> {
    let report = state.cloud.migrate_existing_files().await?;
    Ok(Json(report))
}

pub async fn test_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionTestResult> {
    Json(state.cloud.test_connection().await)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage_enabled: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        storage_enabled: state.cloud.is_enabled(),
    })
}
