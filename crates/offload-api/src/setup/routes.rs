//! Route configuration and setup

use crate::handlers::{files, storage};
use crate::state::AppState;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use offload_core::paths::GENERATE_FILE_ENDPOINT;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub const API_PREFIX: &str = "/api/v0";

/// Requests carry no uploads, only small JSON bodies.
const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_CONCURRENT_REQUESTS: usize = 512;

pub fn setup_routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/storage/migrate", post(storage::migrate))
        .route("/storage/test-connection", get(storage::test_connection))
        .route("/files/{name}/upload-hook", post(files::upload_hook))
        .route("/files/{name}/delete-hook", post(files::delete_hook));

    Router::new()
        .route("/health", get(storage::health))
        .route(GENERATE_FILE_ENDPOINT, get(files::generate_file))
        .nest(API_PREFIX, api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
