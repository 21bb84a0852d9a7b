use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use offload_core::models::FileRecord;
use offload_services::{GenerateFileResponse, UploadOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GenerateFileQuery {
    pub key: Option<String>,
    pub file_name: Option<String>,
}

/// Redirect to a temporary signed URL for the referenced object.
#[tracing::instrument(skip(state, query), fields(operation = "generate_file"))]
pub async fn generate_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerateFileQuery>,
) -> Result<Response, HttpAppError> {
    let response = state
        .cloud
        .generate_file(query.key.as_deref(), query.file_name.as_deref())
        .await?;

    Ok(match response {
        GenerateFileResponse::Redirect(url) => {
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        GenerateFileResponse::Body(text) => (StatusCode::OK, text).into_response(),
    })
}

#[derive(Debug, Serialize)]
pub struct UploadHookResponse {
    pub offloaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<&'static str>,
    pub file: FileRecord,
}

#[tracing::instrument(skip(state), fields(operation = "upload_hook"))]
pub async fn upload_hook(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<UploadHookResponse>, HttpAppError> {
    let record = state.cloud.find_file(&name).await?;

    let response = match state.cloud.upload_hook(&record).await? {
        UploadOutcome::Migrated(updated) => UploadHookResponse {
            offloaded: true,
            skip_reason: None,
            file: updated,
        },
        UploadOutcome::Skipped(reason) => UploadHookResponse {
            offloaded: false,
            skip_reason: Some(reason.as_str()),
            file: record,
        },
    };

    Ok(Json(response))
}

#[tracing::instrument(skip(state), fields(operation = "delete_hook"))]
pub async fn delete_hook(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let record = state.cloud.find_file(&name).await?;
    state.cloud.delete_hook(&record).await?;
    Ok(StatusCode::NO_CONTENT)
}
