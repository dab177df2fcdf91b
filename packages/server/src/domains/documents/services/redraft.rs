//! Deterministic clause redrafting.

use anyhow::Result;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::common::Db;
use crate::domains::documents::models::Analysis;

/// Write a redraft suggestion onto the clause's analysis. Returns `None`
/// when the clause has no analysis row yet.
pub async fn save_redraft(
    db: &Db,
    conn: &mut PgConnection,
    document_id: Uuid,
    clause_id: Uuid,
    original_text: &str,
) -> Result<Option<Analysis>> {
    let redraft_text = format!(
        "Notwithstanding the foregoing, the parties agree: {original_text}"
    );
    Analysis::update_redraft(db, conn, document_id, clause_id, &redraft_text).await
}
