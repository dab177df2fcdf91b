//! Chunk model: physical text segments derived from the parsed structure.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::common::Db;

/// A chunk ready for insertion, before the server generates its id.
#[derive(Debug, Clone)]
pub struct ChunkDraft {
    /// Stable identifier from parser output (or synthesized `p-<page>-<i>`).
    pub block_id: String,
    pub page: i32,
    /// `para`, `heading`, ...
    pub kind: String,
    pub text: String,
    pub meta: serde_json::Value,
}

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub clause_id: Option<Uuid>,
    pub block_id: String,
    pub page: i32,
    pub kind: String,
    pub text: String,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Lightweight projection used when binding clauses to chunks.
#[derive(FromRow, Debug, Clone)]
pub struct ChunkRef {
    pub id: Uuid,
    pub block_id: String,
    pub page: i32,
}

impl Chunk {
    pub async fn insert_draft(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
        draft: &ChunkDraft,
    ) -> Result<()> {
        let chunks = db.table("chunks");
        sqlx::query(&format!(
            r#"
            INSERT INTO {chunks} (document_id, clause_id, block_id, page, kind, text, meta)
            VALUES ($1, NULL, $2, $3, $4, $5, $6)
            "#
        ))
        .bind(document_id)
        .bind(&draft.block_id)
        .bind(draft.page)
        .bind(&draft.kind)
        .bind(&draft.text)
        .bind(&draft.meta)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn exists_for_document(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<bool> {
        let chunks = db.table("chunks");
        let row: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {chunks} WHERE document_id = $1 LIMIT 1"
        ))
        .bind(document_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub async fn refs_for_document(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<Vec<ChunkRef>> {
        let chunks = db.table("chunks");
        let rows = sqlx::query_as::<_, ChunkRef>(&format!(
            "SELECT id, block_id, page FROM {chunks} WHERE document_id = $1 ORDER BY created_at ASC"
        ))
        .bind(document_id)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    pub async fn assign_clause(
        db: &Db,
        conn: &mut PgConnection,
        chunk_id: Uuid,
        clause_id: Uuid,
    ) -> Result<()> {
        let chunks = db.table("chunks");
        sqlx::query(&format!("UPDATE {chunks} SET clause_id = $1 WHERE id = $2"))
            .bind(clause_id)
            .bind(chunk_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
