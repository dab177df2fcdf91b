//! ANALYZE: band every clause against the document's leverage. Terminal
//! stage; enqueues nothing.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::domains::documents::models::{Analysis, Clause, Document, DocumentStatus};
use crate::domains::documents::services::analyzer::analyze_clause;
use crate::kernel::jobs::Job;
use crate::kernel::ServerDeps;

pub async fn handle_analyze(job: Job, deps: Arc<ServerDeps>) -> Result<()> {
    let Some(document_id) = job.document_id else {
        return Ok(());
    };

    let db = deps.db.clone();
    let mut tx = db.pool().begin().await?;

    // Idempotency: every clause already has an analysis.
    let n_clauses = Clause::count_for_document(&db, &mut tx, document_id).await?;
    let n_analyses = Analysis::count_for_document(&db, &mut tx, document_id).await?;
    if n_clauses > 0 && n_analyses >= n_clauses {
        Document::set_status(&db, &mut tx, document_id, DocumentStatus::Analyzed).await?;
        tx.commit().await?;
        return Ok(());
    }

    let Some(document) = Document::find_by_id(&db, &mut tx, document_id).await? else {
        return Ok(());
    };
    let leverage = document.leverage();

    let clauses = Clause::list_for_document(&db, &mut tx, document_id).await?;
    for clause in &clauses {
        analyze_clause(
            &db,
            &mut tx,
            document_id,
            clause.id,
            clause.clause_key.as_deref().unwrap_or(""),
            clause.text.as_deref().unwrap_or(""),
            &leverage,
            None,
        )
        .await?;
    }

    Document::set_status(&db, &mut tx, document_id, DocumentStatus::Analyzed).await?;
    info!(event = "analyzed", document_id = %document_id, n = clauses.len(), "document analyzed");
    tx.commit().await?;
    Ok(())
}
