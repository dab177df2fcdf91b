//! Clause model: an extracted passage with semantic annotation.
//!
//! Clauses are created in batch during EXTRACT_NORMALIZE and never updated;
//! they are deleted only with their document.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::common::{Db, Snippet};

const CLAUSE_COLUMNS: &str =
    "id, document_id, clause_key, title, text, start_idx, end_idx, page_hint, \
     band_key, score, json_meta, created_at";

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Clause {
    pub id: Uuid,
    pub document_id: Uuid,
    pub clause_key: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub start_idx: Option<i32>,
    pub end_idx: Option<i32>,
    pub page_hint: Option<i32>,
    pub band_key: Option<String>,
    pub score: Option<f64>,
    pub json_meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Clause {
    /// Insert one clause from a normalized snippet, returning the server
    /// generated id.
    pub async fn insert_from_snippet(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
        snippet: &Snippet,
    ) -> Result<Uuid> {
        let clauses = db.table("clauses");
        let id: Uuid = sqlx::query_scalar(&format!(
            r#"
            INSERT INTO {clauses}
                (document_id, clause_key, title, text, start_idx, end_idx, page_hint, json_meta)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#
        ))
        .bind(document_id)
        .bind(&snippet.clause_key)
        .bind(&snippet.title)
        .bind(&snippet.text)
        .bind(snippet.start_idx)
        .bind(snippet.end_idx)
        .bind(snippet.page_hint)
        .bind(snippet.meta_for_storage())
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    pub async fn list_for_document(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<Vec<Clause>> {
        let clauses = db.table("clauses");
        let rows = sqlx::query_as::<_, Clause>(&format!(
            "SELECT {CLAUSE_COLUMNS} FROM {clauses} WHERE document_id = $1 ORDER BY created_at ASC"
        ))
        .bind(document_id)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    pub async fn exists_for_document(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<bool> {
        let clauses = db.table("clauses");
        let row: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {clauses} WHERE document_id = $1 LIMIT 1"
        ))
        .bind(document_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub async fn count_for_document(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<i64> {
        let clauses = db.table("clauses");
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {clauses} WHERE document_id = $1"
        ))
        .bind(document_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Fetch a clause joined with its owning document's leverage, checking
    /// document ownership.
    pub async fn find_with_leverage(
        db: &Db,
        conn: &mut PgConnection,
        clause_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<(Clause, serde_json::Value)>> {
        let clauses = db.table("clauses");
        let documents = db.table("documents");
        let row: Option<(Clause, serde_json::Value)> = sqlx::query_as::<_, ClauseWithLeverage>(&format!(
            r#"
            SELECT c.id, c.document_id, c.clause_key, c.title, c.text, c.start_idx,
                   c.end_idx, c.page_hint, c.band_key, c.score, c.json_meta, c.created_at,
                   d.leverage_json
            FROM {clauses} c
            JOIN {documents} d ON d.id = c.document_id
            WHERE c.id = $1 AND d.user_id = $2
            "#
        ))
        .bind(clause_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .map(|joined| (joined.clause(), joined.leverage_json));
        Ok(row)
    }
}

#[derive(FromRow)]
struct ClauseWithLeverage {
    id: Uuid,
    document_id: Uuid,
    clause_key: Option<String>,
    title: Option<String>,
    text: Option<String>,
    start_idx: Option<i32>,
    end_idx: Option<i32>,
    page_hint: Option<i32>,
    band_key: Option<String>,
    score: Option<f64>,
    json_meta: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    leverage_json: serde_json::Value,
}

impl ClauseWithLeverage {
    fn clause(&self) -> Clause {
        Clause {
            id: self.id,
            document_id: self.document_id,
            clause_key: self.clause_key.clone(),
            title: self.title.clone(),
            text: self.text.clone(),
            start_idx: self.start_idx,
            end_idx: self.end_idx,
            page_hint: self.page_hint,
            band_key: self.band_key.clone(),
            score: self.score,
            json_meta: self.json_meta.clone(),
            created_at: self.created_at,
        }
    }
}
