//! Analysis model: one per (document, clause).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::common::Db;

const ANALYSIS_COLUMNS: &str =
    "id, document_id, clause_id, band_name, band_score, inputs_json, \
     analysis_json, redraft_text, created_at";

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Analysis {
    pub id: Uuid,
    pub document_id: Uuid,
    pub clause_id: Uuid,
    /// Classification of the clause's market position, e.g. `market`.
    pub band_name: Option<String>,
    pub band_score: Option<f64>,
    pub inputs_json: Option<serde_json::Value>,
    pub analysis_json: Option<serde_json::Value>,
    pub redraft_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    /// Upsert on `(document_id, clause_id)` so re-running ANALYZE or the
    /// on-demand analyze endpoint converges instead of duplicating rows.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
        clause_id: Uuid,
        band_name: &str,
        band_score: f64,
        inputs_json: &serde_json::Value,
        analysis_json: &serde_json::Value,
    ) -> Result<Analysis> {
        let analyses = db.table("analyses");
        let row = sqlx::query_as::<_, Analysis>(&format!(
            r#"
            INSERT INTO {analyses}
                (document_id, clause_id, band_name, band_score, inputs_json, analysis_json)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (document_id, clause_id) DO UPDATE SET
                band_name = EXCLUDED.band_name,
                band_score = EXCLUDED.band_score,
                inputs_json = EXCLUDED.inputs_json,
                analysis_json = EXCLUDED.analysis_json
            RETURNING {ANALYSIS_COLUMNS}
            "#
        ))
        .bind(document_id)
        .bind(clause_id)
        .bind(band_name)
        .bind(band_score)
        .bind(inputs_json)
        .bind(analysis_json)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    pub async fn count_for_document(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<i64> {
        let analyses = db.table("analyses");
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {analyses} WHERE document_id = $1"
        ))
        .bind(document_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Write a redraft onto the clause's analysis. Returns `None` when the
    /// clause has not been analyzed yet.
    pub async fn update_redraft(
        db: &Db,
        conn: &mut PgConnection,
        document_id: Uuid,
        clause_id: Uuid,
        redraft_text: &str,
    ) -> Result<Option<Analysis>> {
        let analyses = db.table("analyses");
        let row = sqlx::query_as::<_, Analysis>(&format!(
            r#"
            UPDATE {analyses}
            SET redraft_text = $1
            WHERE document_id = $2 AND clause_id = $3
            RETURNING {ANALYSIS_COLUMNS}
            "#
        ))
        .bind(redraft_text)
        .bind(document_id)
        .bind(clause_id)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }
}
