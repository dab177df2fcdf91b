//! Upload endpoint: the HTTP face of the ingest gate.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::domains::documents::ingest::ingest_upload;
use crate::kernel::ServerDeps;
use crate::server::error::ApiError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
}

pub async fn upload_document(
    State(deps): State<Arc<ServerDeps>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") || field.file_name().is_some() {
            let filename = field
                .file_name()
                .unwrap_or("upload.bin")
                .to_string();
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("failed to read upload: {e}")))?;
            file = Some((filename, content_type, bytes));
            break;
        }
    }

    let Some((filename, content_type, bytes)) = file else {
        return Err(ApiError::Validation("missing file field".to_string()));
    };

    let outcome = ingest_upload(
        &deps,
        deps.demo_user_id,
        &filename,
        content_type.as_deref(),
        &bytes,
    )
    .await?;

    Ok(Json(UploadResponse {
        document_id: outcome.document_id,
    }))
}
