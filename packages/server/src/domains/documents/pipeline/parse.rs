//! PARSE_DOC: fetch the blob, parse it, persist page structure and text.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::domains::documents::models::Document;
use crate::kernel::jobs::Job;
use crate::kernel::parsing::{parse_docx_naive, parse_pdf_naive};
use crate::kernel::{ServerDeps, DOCUMENTS_BUCKET};

use super::{chunks_key, CHUNK_EMBED};

#[derive(Debug, Default, Deserialize)]
struct ParseInput {
    #[serde(default)]
    mime: Option<String>,
    #[serde(default)]
    blob_path: Option<String>,
}

pub async fn handle_parse_doc(job: Job, deps: Arc<ServerDeps>) -> Result<()> {
    let Some(document_id) = job.document_id else {
        return Ok(());
    };
    let input: ParseInput = job
        .payload
        .as_ref()
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default();
    let Some(blob_path) = input.blob_path else {
        return Ok(());
    };

    let db = deps.db.clone();
    let mut tx = db.pool().begin().await?;

    // Idempotency: pages already persisted means parse is done; just chain.
    let existing: Option<Option<serde_json::Value>> = sqlx::query_scalar(&format!(
        "SELECT pages_json FROM {} WHERE id = $1",
        db.table("documents")
    ))
    .bind(document_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(pages_json) = existing else {
        // Document row is gone; nothing to parse.
        return Ok(());
    };
    if pages_json.is_some() {
        deps.jobs
            .enqueue_on(
                &mut tx,
                CHUNK_EMBED,
                Some(document_id),
                json!({"document_id": document_id}),
                Some(&chunks_key(document_id)),
            )
            .await?;
        tx.commit().await?;
        return Ok(());
    }

    let bytes = deps.blob_store.get(DOCUMENTS_BUCKET, &blob_path).await?;

    // Structured parser first; anything unusable falls back to the naive
    // MIME-specific parsers.
    let parsed = match deps.structured_parser.parse(&bytes).await {
        Ok(parsed) if !parsed.pages.is_empty() => parsed,
        _ => {
            let mime = input.mime.as_deref().unwrap_or("").to_lowercase();
            if mime.starts_with("application/pdf") {
                parse_pdf_naive(&bytes)
            } else {
                parse_docx_naive(&bytes)
            }
        }
    };

    let pages_value = serde_json::to_value(&parsed.pages)?;
    Document::set_parsed(&db, &mut tx, document_id, &parsed.text_plain, &pages_value).await?;

    deps.jobs
        .enqueue_on(
            &mut tx,
            CHUNK_EMBED,
            Some(document_id),
            json!({"document_id": document_id}),
            Some(&chunks_key(document_id)),
        )
        .await?;

    info!(
        event = "parsed",
        document_id = %document_id,
        engine = %parsed.pages.parser.engine,
        "document parsed"
    );
    tx.commit().await?;
    Ok(())
}
