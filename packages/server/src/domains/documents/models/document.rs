//! Document model: one uploaded file and its pipeline artifacts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::common::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Parsed,
    Chunked,
    Extracted,
    Graphed,
    Analyzed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Parsed => "parsed",
            DocumentStatus::Chunked => "chunked",
            DocumentStatus::Extracted => "extracted",
            DocumentStatus::Graphed => "graphed",
            DocumentStatus::Analyzed => "analyzed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analyzer weighting between the parties, stored per document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Leverage {
    pub investor: f64,
    pub founder: f64,
}

impl Default for Leverage {
    fn default() -> Self {
        Self {
            investor: 0.6,
            founder: 0.4,
        }
    }
}

impl Leverage {
    /// Parse from the stored JSON, falling back to the defaults when the
    /// column is null or malformed.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, user_id, filename, mime, blob_path, checksum, status, pages_json, \
     text_plain, graph_json, leverage_json, created_at";

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub mime: Option<String>,
    /// Immutable after creation.
    pub blob_path: String,
    /// Hex SHA-256 over the raw upload bytes.
    pub checksum: String,
    pub status: DocumentStatus,
    pub pages_json: Option<serde_json::Value>,
    pub text_plain: Option<String>,
    pub graph_json: Option<serde_json::Value>,
    pub leverage_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn leverage(&self) -> Leverage {
        Leverage::from_json(Some(&self.leverage_json))
    }

    /// Insert a new uploaded document. Returns `None` when a concurrent
    /// upload of the same bytes won the `(user_id, checksum)` race.
    pub async fn insert(
        db: &Db,
        conn: &mut PgConnection,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        mime: Option<&str>,
        blob_path: &str,
        checksum: &str,
    ) -> Result<Option<Document>> {
        let documents = db.table("documents");
        let row = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO {documents} (id, user_id, filename, mime, blob_path, checksum)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, checksum) DO NOTHING
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(filename)
        .bind(mime)
        .bind(blob_path)
        .bind(checksum)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(
        db: &Db,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Document>> {
        let documents = db.table("documents");
        let row = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM {documents} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }

    pub async fn find_for_user(
        db: &Db,
        conn: &mut PgConnection,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Document>> {
        let documents = db.table("documents");
        let row = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM {documents} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }

    /// Dedup lookup at ingest: same user, same bytes.
    pub async fn find_by_checksum(
        db: &Db,
        conn: &mut PgConnection,
        user_id: Uuid,
        checksum: &str,
    ) -> Result<Option<Document>> {
        let documents = db.table("documents");
        let row = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM {documents} WHERE user_id = $1 AND checksum = $2"
        ))
        .bind(user_id)
        .bind(checksum)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }

    /// PARSE_DOC artifact write: plain text, page structure, `parsed` status.
    pub async fn set_parsed(
        db: &Db,
        conn: &mut PgConnection,
        id: Uuid,
        text_plain: &str,
        pages_json: &serde_json::Value,
    ) -> Result<()> {
        let documents = db.table("documents");
        sqlx::query(&format!(
            "UPDATE {documents} SET text_plain = $1, pages_json = $2, status = 'parsed' WHERE id = $3"
        ))
        .bind(text_plain)
        .bind(pages_json)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_status(
        db: &Db,
        conn: &mut PgConnection,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<()> {
        let documents = db.table("documents");
        sqlx::query(&format!("UPDATE {documents} SET status = $1 WHERE id = $2"))
            .bind(status)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// BAND_MAP_GRAPH artifact write: graph plus `graphed` status.
    pub async fn set_graphed(
        db: &Db,
        conn: &mut PgConnection,
        id: Uuid,
        graph_json: &serde_json::Value,
    ) -> Result<()> {
        let documents = db.table("documents");
        sqlx::query(&format!(
            "UPDATE {documents} SET graph_json = $1, status = 'graphed' WHERE id = $2"
        ))
        .bind(graph_json)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leverage_defaults_when_absent_or_malformed() {
        let leverage = Leverage::from_json(None);
        assert_eq!(leverage.investor, 0.6);
        assert_eq!(leverage.founder, 0.4);

        let bad = serde_json::json!("not an object");
        let leverage = Leverage::from_json(Some(&bad));
        assert_eq!(leverage.investor, 0.6);
    }

    #[test]
    fn leverage_parses_stored_json() {
        let stored = serde_json::json!({"investor": 0.8, "founder": 0.2});
        let leverage = Leverage::from_json(Some(&stored));
        assert_eq!(leverage.investor, 0.8);
        assert_eq!(leverage.founder, 0.2);
    }

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(DocumentStatus::Uploaded.to_string(), "uploaded");
        assert_eq!(DocumentStatus::Analyzed.to_string(), "analyzed");
    }
}
