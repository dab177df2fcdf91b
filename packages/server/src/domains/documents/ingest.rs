//! Ingest gate: the upload entry point.
//!
//! Computes the content checksum, collapses duplicate uploads onto the
//! existing document via the `(user_id, checksum)` unique key, persists the
//! blob, and enqueues the initial PARSE_DOC job under the canonical
//! checksum-scoped idempotency key.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::common::content_checksum;
use crate::domains::documents::models::{Document, DocumentStatus};
use crate::domains::documents::pipeline::{parse_key, PARSE_DOC};
use crate::kernel::{blob_path, ServerDeps, DOCUMENTS_BUCKET};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("empty file")]
    EmptyFile,
    #[error("storage not configured: {0}")]
    Storage(#[source] anyhow::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document_id: Uuid,
    /// True when the upload collapsed onto an existing document.
    pub deduplicated: bool,
}

/// Accept one uploaded file for the given user.
pub async fn ingest_upload(
    deps: &Arc<ServerDeps>,
    user_id: Uuid,
    filename: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<IngestOutcome, IngestError> {
    let mime = resolve_mime(filename, content_type);
    if !is_supported(filename, &mime) {
        return Err(IngestError::UnsupportedType(mime));
    }
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let checksum = content_checksum(bytes);
    let db = deps.db.clone();

    // Dedup: identical bytes from the same user map to the same document.
    {
        let mut conn = db.pool().acquire().await?;
        if let Some(existing) = Document::find_by_checksum(&db, &mut conn, user_id, &checksum).await?
        {
            requeue_parse_if_pending(deps, &existing).await?;
            info!(
                document_id = %existing.id,
                checksum = %checksum,
                "duplicate upload collapsed onto existing document"
            );
            return Ok(IngestOutcome {
                document_id: existing.id,
                deduplicated: true,
            });
        }
    }

    let document_id = Uuid::new_v4();
    let path = blob_path(user_id, document_id, filename);
    deps.blob_store
        .put(DOCUMENTS_BUCKET, &path, bytes, &mime)
        .await
        .map_err(IngestError::Storage)?;

    // Document row and initial parse job commit together.
    let mut tx = db.pool().begin().await.map_err(IngestError::Database)?;
    let inserted = Document::insert(
        &db,
        &mut tx,
        document_id,
        user_id,
        filename,
        Some(&mime),
        &path,
        &checksum,
    )
    .await?;

    let Some(document) = inserted else {
        // Lost the race to a concurrent identical upload; adopt the winner.
        drop(tx);
        let mut conn = db.pool().acquire().await?;
        let existing = Document::find_by_checksum(&db, &mut conn, user_id, &checksum)
            .await?
            .ok_or_else(|| anyhow::anyhow!("concurrent upload vanished for checksum {checksum}"))?;
        requeue_parse_if_pending(deps, &existing).await?;
        return Ok(IngestOutcome {
            document_id: existing.id,
            deduplicated: true,
        });
    };

    deps.jobs
        .enqueue_on(
            &mut tx,
            PARSE_DOC,
            Some(document.id),
            json!({"mime": mime, "blob_path": path}),
            Some(&parse_key(document.id, &checksum)),
        )
        .await?;
    tx.commit().await.map_err(IngestError::Database)?;

    info!(document_id = %document.id, filename, "document ingested");
    Ok(IngestOutcome {
        document_id: document.id,
        deduplicated: false,
    })
}

/// Auto-heal rule shared by ingest dedup and the status endpoint: a document
/// still `uploaded` with no queued/working job gets its parse job upserted
/// back to `queued` under the canonical key.
pub async fn heal_if_stalled(deps: &Arc<ServerDeps>, document: &Document) -> Result<(), IngestError> {
    if document.status != DocumentStatus::Uploaded {
        return Ok(());
    }
    if deps.jobs.has_active_job_for_document(document.id).await? {
        return Ok(());
    }
    let result = upsert_parse_job(deps, document).await?;
    info!(
        document_id = %document.id,
        job_id = %result,
        "auto-requeued parse job for stalled document"
    );
    Ok(())
}

/// On dedup, make sure a not-yet-parsed document has its parse job queued.
async fn requeue_parse_if_pending(
    deps: &Arc<ServerDeps>,
    document: &Document,
) -> Result<(), IngestError> {
    if document.status == DocumentStatus::Uploaded {
        upsert_parse_job(deps, document).await?;
    }
    Ok(())
}

async fn upsert_parse_job(
    deps: &Arc<ServerDeps>,
    document: &Document,
) -> Result<Uuid, IngestError> {
    let result = deps
        .jobs
        .enqueue(
            PARSE_DOC,
            Some(document.id),
            json!({"mime": document.mime, "blob_path": document.blob_path}),
            Some(&parse_key(document.id, &document.checksum)),
        )
        .await?;
    Ok(result.job_id())
}

fn resolve_mime(filename: &str, content_type: Option<&str>) -> String {
    match content_type {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn is_supported(filename: &str, mime: &str) -> bool {
    let ext = extension(filename);
    let is_pdf = mime == "application/pdf" || ext == "pdf";
    let is_docx = matches!(ext.as_str(), "docx" | "doc")
        || mime.contains("wordprocessingml")
        || mime == "application/msword";
    is_pdf || is_docx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_and_docx_are_supported() {
        assert!(is_supported("deal.pdf", "application/pdf"));
        assert!(is_supported("deal.PDF", "application/octet-stream"));
        assert!(is_supported("deal.docx", "application/octet-stream"));
        assert!(is_supported(
            "deal.bin",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(is_supported("old.doc", "application/msword"));
    }

    #[test]
    fn other_types_are_rejected() {
        assert!(!is_supported("notes.txt", "text/plain"));
        assert!(!is_supported("image.png", "image/png"));
    }

    #[test]
    fn mime_falls_back_to_extension_guess() {
        assert_eq!(resolve_mime("deal.pdf", None), "application/pdf");
        assert_eq!(resolve_mime("deal.pdf", Some("")), "application/pdf");
        assert_eq!(
            resolve_mime("deal.pdf", Some("application/custom")),
            "application/custom"
        );
    }
}
