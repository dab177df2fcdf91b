//! CHUNK_EMBED: derive physical chunks from the page structure, optionally
//! compute embeddings.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::{debug, info};

use crate::common::PagesJson;
use crate::domains::documents::models::{Chunk, Document, DocumentStatus};
use crate::domains::documents::services::chunking::chunks_from_pages;
use crate::kernel::all_zero_stubs;
use crate::kernel::jobs::Job;
use crate::kernel::ServerDeps;

use super::{extract_key, EXTRACT_NORMALIZE};

pub async fn handle_chunk_embed(job: Job, deps: Arc<ServerDeps>) -> Result<()> {
    let Some(document_id) = job.document_id else {
        return Ok(());
    };

    let db = deps.db.clone();
    let mut tx = db.pool().begin().await?;

    // Idempotency: chunks already derived; just chain.
    if Chunk::exists_for_document(&db, &mut tx, document_id).await? {
        deps.jobs
            .enqueue_on(
                &mut tx,
                EXTRACT_NORMALIZE,
                Some(document_id),
                json!({"document_id": document_id}),
                Some(&extract_key(document_id)),
            )
            .await?;
        tx.commit().await?;
        return Ok(());
    }

    let pages_value: Option<Option<serde_json::Value>> = sqlx::query_scalar(&format!(
        "SELECT pages_json FROM {} WHERE id = $1",
        db.table("documents")
    ))
    .bind(document_id)
    .fetch_optional(&mut *tx)
    .await?;
    let pages: PagesJson = pages_value
        .flatten()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let chunks = chunks_from_pages(&pages);
    for draft in &chunks {
        Chunk::insert_draft(&db, &mut tx, document_id, draft).await?;
    }

    if deps.embeddings_enabled && !chunks.is_empty() {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = deps.embedder.embed(&texts).await?;
        if all_zero_stubs(&vectors) {
            debug!(document_id = %document_id, "zero-vector stub embeddings; skipping persistence");
        } else {
            debug!(document_id = %document_id, count = vectors.len(), "embeddings computed");
        }
    }

    Document::set_status(&db, &mut tx, document_id, DocumentStatus::Chunked).await?;
    deps.jobs
        .enqueue_on(
            &mut tx,
            EXTRACT_NORMALIZE,
            Some(document_id),
            json!({"document_id": document_id}),
            Some(&extract_key(document_id)),
        )
        .await?;

    info!(event = "chunked", document_id = %document_id, n = chunks.len(), "chunks derived");
    tx.commit().await?;
    Ok(())
}
