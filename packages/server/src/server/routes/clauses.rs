//! Single-clause endpoints: detail, on-demand analyze, redraft.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::domains::documents::models::{Analysis, Clause, Leverage};
use crate::domains::documents::services::analyzer::analyze_clause;
use crate::domains::documents::services::redraft::save_redraft;
use crate::kernel::ServerDeps;
use crate::server::error::ApiError;

use super::documents::ClauseOut;

#[derive(Debug, Serialize)]
pub struct AnalysisOut {
    pub id: Uuid,
    pub clause_id: Uuid,
    pub band_name: Option<String>,
    pub band_score: Option<f64>,
    pub analysis_json: Option<serde_json::Value>,
    pub redraft_text: Option<String>,
}

impl From<Analysis> for AnalysisOut {
    fn from(analysis: Analysis) -> Self {
        Self {
            id: analysis.id,
            clause_id: analysis.clause_id,
            band_name: analysis.band_name,
            band_score: analysis.band_score,
            analysis_json: analysis.analysis_json,
            redraft_text: analysis.redraft_text,
        }
    }
}

async fn owned_clause(
    deps: &Arc<ServerDeps>,
    clause_id: Uuid,
) -> Result<(Clause, Leverage), ApiError> {
    let mut conn = deps.db.pool().acquire().await?;
    let (clause, leverage_json) =
        Clause::find_with_leverage(&deps.db, &mut conn, clause_id, deps.demo_user_id)
            .await?
            .ok_or(ApiError::NotFound)?;
    Ok((clause, Leverage::from_json(Some(&leverage_json))))
}

pub async fn get_clause(
    State(deps): State<Arc<ServerDeps>>,
    Path(clause_id): Path<Uuid>,
) -> Result<Json<ClauseOut>, ApiError> {
    let (clause, _) = owned_clause(&deps, clause_id).await?;
    Ok(Json(ClauseOut::from(&clause)))
}

pub async fn analyze(
    State(deps): State<Arc<ServerDeps>>,
    Path(clause_id): Path<Uuid>,
) -> Result<Json<AnalysisOut>, ApiError> {
    let (clause, leverage) = owned_clause(&deps, clause_id).await?;

    let mut conn = deps.db.pool().acquire().await?;
    let analysis = analyze_clause(
        &deps.db,
        &mut conn,
        clause.document_id,
        clause.id,
        clause.clause_key.as_deref().unwrap_or(""),
        clause.text.as_deref().unwrap_or(""),
        &leverage,
        Some(&serde_json::json!({})),
    )
    .await?;

    Ok(Json(AnalysisOut::from(analysis)))
}

pub async fn redraft(
    State(deps): State<Arc<ServerDeps>>,
    Path(clause_id): Path<Uuid>,
) -> Result<Json<AnalysisOut>, ApiError> {
    let (clause, _) = owned_clause(&deps, clause_id).await?;

    let mut conn = deps.db.pool().acquire().await?;
    let analysis = save_redraft(
        &deps.db,
        &mut conn,
        clause.document_id,
        clause.id,
        clause.text.as_deref().unwrap_or(""),
    )
    .await?
    .ok_or_else(|| ApiError::Validation("clause has no analysis to redraft".to_string()))?;

    Ok(Json(AnalysisOut::from(analysis)))
}
