//! BAND_MAP_GRAPH: build and persist the clause relationship graph.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::domains::documents::models::{Clause, Document};
use crate::domains::documents::services::graph::{build_graph, GraphNode};
use crate::kernel::jobs::Job;
use crate::kernel::ServerDeps;

use super::{analyze_key, ANALYZE};

pub async fn handle_band_map_graph(job: Job, deps: Arc<ServerDeps>) -> Result<()> {
    let Some(document_id) = job.document_id else {
        return Ok(());
    };

    let db = deps.db.clone();
    let mut tx = db.pool().begin().await?;

    // Idempotency: graph already built; just chain.
    let existing: Option<Option<serde_json::Value>> = sqlx::query_scalar(&format!(
        "SELECT graph_json FROM {} WHERE id = $1",
        db.table("documents")
    ))
    .bind(document_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(graph_json) = existing else {
        return Ok(());
    };
    if graph_json.is_some() {
        deps.jobs
            .enqueue_on(
                &mut tx,
                ANALYZE,
                Some(document_id),
                json!({"document_id": document_id}),
                Some(&analyze_key(document_id)),
            )
            .await?;
        tx.commit().await?;
        return Ok(());
    }

    let clauses = Clause::list_for_document(&db, &mut tx, document_id).await?;
    let nodes: Vec<GraphNode> = clauses
        .iter()
        .map(|clause| GraphNode {
            id: clause.id.to_string(),
            clause_key: clause.clause_key.clone(),
            title: clause.title.clone(),
        })
        .collect();

    let graph = build_graph(document_id, &nodes);
    Document::set_graphed(&db, &mut tx, document_id, &graph).await?;

    deps.jobs
        .enqueue_on(
            &mut tx,
            ANALYZE,
            Some(document_id),
            json!({"document_id": document_id}),
            Some(&analyze_key(document_id)),
        )
        .await?;

    info!(event = "graphed", document_id = %document_id, nodes = nodes.len(), "graph built");
    tx.commit().await?;
    Ok(())
}
