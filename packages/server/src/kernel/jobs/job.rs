//! Job model for the durable pipeline queue.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Working,
    Done,
    Failed,
}

/// One row in the work queue: a single pending or in-flight execution of a
/// pipeline stage for a document.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    /// Stage name, e.g. `PARSE_DOC`. Extensible: unknown types are
    /// dead-lettered by the worker, not rejected at enqueue.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub job_type: String,

    #[builder(default, setter(strip_option))]
    pub document_id: Option<Uuid>,

    /// Small JSON payload: inputs that cannot be reconstructed from the
    /// document row (e.g. mime + blob path for the initial parse).
    #[builder(default, setter(strip_option))]
    pub payload: Option<serde_json::Value>,

    #[builder(default)]
    pub status: JobStatus,

    #[builder(default = 0)]
    pub attempts: i32,

    /// Globally unique; collapses re-enqueues of the same logical work onto
    /// one row. Nullable only for non-chained external submissions.
    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,

    #[builder(default, setter(strip_option))]
    pub last_error: Option<String>,

    #[builder(default, setter(strip_option))]
    pub failed_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    /// Heartbeat proxy while `working`; the reaper requeues rows whose
    /// `updated_at` falls behind the staleness threshold.
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// Column list shared by every query that reads full job rows.
pub(crate) const JOB_COLUMNS: &str =
    "id, type, document_id, payload, status, attempts, idempotency_key, \
     last_error, failed_at, created_at, updated_at";

impl Job {
    /// Deserialize the JSON payload into a typed input struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| anyhow!("job {} has no payload", self.id))?;
        serde_json::from_value(payload.clone())
            .map_err(|e| anyhow!("failed to deserialize payload for job {}: {}", self.id, e))
    }
}
