//! Application setup and router configuration.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    analyze, get_clause, get_document, get_document_status, health_handler, list_clauses,
    redraft, upload_document,
};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_document))
        .route("/documents/:id", get(get_document))
        .route("/documents/:id/status", get(get_document_status))
        .route("/documents/:id/clauses", get(list_clauses))
        .route("/clauses/:id", get(get_clause))
        .route("/clauses/:id/analyze", post(analyze))
        .route("/clauses/:id/redraft", post(redraft))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(deps)
}
