//! Document detail, status (with auto-heal), and clause listing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domains::documents::ingest::heal_if_stalled;
use crate::domains::documents::models::{Clause, Document, DocumentStatus};
use crate::kernel::ServerDeps;
use crate::server::error::ApiError;

#[derive(Debug, Serialize)]
pub struct DocumentOut {
    pub id: Uuid,
    pub filename: String,
    pub mime: Option<String>,
    pub blob_path: String,
    pub status: DocumentStatus,
    pub leverage_json: serde_json::Value,
    pub graph_json: Option<serde_json::Value>,
    pub pages_json: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ClauseOut {
    pub id: Uuid,
    pub document_id: Uuid,
    pub clause_key: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub page_hint: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StatusOut {
    pub status: DocumentStatus,
}

impl From<&Clause> for ClauseOut {
    fn from(clause: &Clause) -> Self {
        Self {
            id: clause.id,
            document_id: clause.document_id,
            clause_key: clause.clause_key.clone(),
            title: clause.title.clone(),
            text: clause.text.clone(),
            page_hint: clause.page_hint,
        }
    }
}

pub async fn get_document(
    State(deps): State<Arc<ServerDeps>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentOut>, ApiError> {
    let mut conn = deps.db.pool().acquire().await?;
    let document = Document::find_for_user(&deps.db, &mut conn, document_id, deps.demo_user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(DocumentOut {
        id: document.id,
        filename: document.filename,
        mime: document.mime,
        blob_path: document.blob_path,
        status: document.status,
        leverage_json: document.leverage_json,
        graph_json: document.graph_json,
        pages_json: document.pages_json,
    }))
}

/// Status polling endpoint. Implements the auto-heal rule: a document stuck
/// in `uploaded` with no active job gets its parse job re-enqueued.
pub async fn get_document_status(
    State(deps): State<Arc<ServerDeps>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<StatusOut>, ApiError> {
    let document = {
        let mut conn = deps.db.pool().acquire().await?;
        Document::find_for_user(&deps.db, &mut conn, document_id, deps.demo_user_id)
            .await?
            .ok_or(ApiError::NotFound)?
    };

    heal_if_stalled(&deps, &document).await?;

    info!(document_id = %document_id, status = %document.status, "document status");
    Ok(Json(StatusOut {
        status: document.status,
    }))
}

pub async fn list_clauses(
    State(deps): State<Arc<ServerDeps>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<ClauseOut>>, ApiError> {
    let mut conn = deps.db.pool().acquire().await?;
    // Ownership check before listing children.
    Document::find_for_user(&deps.db, &mut conn, document_id, deps.demo_user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let clauses = Clause::list_for_document(&deps.db, &mut conn, document_id).await?;
    Ok(Json(clauses.iter().map(ClauseOut::from).collect()))
}
