//! EXTRACT_NORMALIZE: extract clause snippets, normalize, persist clauses,
//! and bind them to chunks.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::common::PagesJson;
use crate::domains::documents::models::{Chunk, Clause, Document, DocumentStatus};
use crate::domains::documents::services::extract_rules::{
    extract_from_structured, extract_from_text, overview_snippet,
};
use crate::domains::documents::services::normalize::normalize;
use crate::kernel::jobs::Job;
use crate::kernel::ServerDeps;

use super::{band_key, BAND_MAP_GRAPH};

pub async fn handle_extract_normalize(job: Job, deps: Arc<ServerDeps>) -> Result<()> {
    let Some(document_id) = job.document_id else {
        return Ok(());
    };

    let db = deps.db.clone();
    let mut tx = db.pool().begin().await?;

    // Idempotency: clauses already extracted; just chain.
    if Clause::exists_for_document(&db, &mut tx, document_id).await? {
        deps.jobs
            .enqueue_on(
                &mut tx,
                BAND_MAP_GRAPH,
                Some(document_id),
                json!({"document_id": document_id}),
                Some(&band_key(document_id)),
            )
            .await?;
        tx.commit().await?;
        return Ok(());
    }

    let row: Option<(Option<String>, Option<serde_json::Value>)> = sqlx::query_as(&format!(
        "SELECT text_plain, pages_json FROM {} WHERE id = $1",
        db.table("documents")
    ))
    .bind(document_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((text_plain, pages_value)) = row else {
        return Ok(());
    };
    let text_plain = text_plain.unwrap_or_default();
    let pages: PagesJson = pages_value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    // Structured extraction when blocks exist, plain-text regex otherwise;
    // as a last resort synthesize a document overview from the text.
    let mut snippets = if pages.blocks.is_empty() {
        Vec::new()
    } else {
        extract_from_structured(&pages)
    };
    if snippets.is_empty() {
        snippets = extract_from_text(&text_plain);
    }
    if snippets.is_empty() && !text_plain.trim().is_empty() {
        snippets = vec![overview_snippet(&text_plain)];
    }

    let normalized = normalize(snippets);
    let mut clause_ids = Vec::with_capacity(normalized.len());
    for snippet in &normalized {
        clause_ids.push(Clause::insert_from_snippet(&db, &mut tx, document_id, snippet).await?);
    }

    // Bind each clause to a chunk: matching block id first, then the chunk
    // on its page hint, then the chunk on page 0.
    let refs = Chunk::refs_for_document(&db, &mut tx, document_id).await?;
    let mut block_to_chunk: HashMap<&str, Uuid> = HashMap::new();
    let mut page_to_chunk: HashMap<i32, Uuid> = HashMap::new();
    for chunk in &refs {
        block_to_chunk.insert(chunk.block_id.as_str(), chunk.id);
        page_to_chunk.entry(chunk.page).or_insert(chunk.id);
    }

    for (clause_id, snippet) in clause_ids.iter().zip(&normalized) {
        let target = snippet
            .block_ids
            .iter()
            .find_map(|block_id| block_to_chunk.get(block_id.as_str()).copied())
            .or_else(|| snippet.page_hint.and_then(|page| page_to_chunk.get(&page).copied()))
            .or_else(|| page_to_chunk.get(&0).copied());
        if let Some(chunk_id) = target {
            Chunk::assign_clause(&db, &mut tx, chunk_id, *clause_id).await?;
        }
    }

    Document::set_status(&db, &mut tx, document_id, DocumentStatus::Extracted).await?;
    deps.jobs
        .enqueue_on(
            &mut tx,
            BAND_MAP_GRAPH,
            Some(document_id),
            json!({"document_id": document_id}),
            Some(&band_key(document_id)),
        )
        .await?;

    info!(event = "extracted", document_id = %document_id, n = clause_ids.len(), "clauses extracted");
    tx.commit().await?;
    Ok(())
}
