//! PostgreSQL-backed job queue.
//!
//! The queue is the single shared mutable resource of the pipeline. All
//! mutation goes through one of three shapes: the upsert in [`JobQueue::enqueue_on`],
//! the skip-locked claim in [`JobQueue::claim`], or per-row updates keyed by
//! job id (`finish` / `fail` / `reset_stale`).

use std::time::Duration;

use anyhow::{anyhow, Result};
use sqlx::PgConnection;
use tracing::warn;
use uuid::Uuid;

use super::job::{Job, JOB_COLUMNS};
use crate::common::Db;

/// Result of an enqueue that handles idempotency.
#[derive(Debug, Clone)]
pub enum EnqueueResult {
    /// The row was inserted, or an existing `queued|done|failed` row was
    /// reset to `queued`. Returns the canonical job id.
    Queued(Uuid),
    /// A worker currently holds the job; the row was left untouched.
    InFlight(Uuid),
}

impl EnqueueResult {
    /// Get the job id regardless of outcome.
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Queued(id) | EnqueueResult::InFlight(id) => *id,
        }
    }

    /// Returns true if the job is now available for claiming.
    pub fn is_queued(&self) -> bool {
        matches!(self, EnqueueResult::Queued(_))
    }
}

/// What the failure controller did with an errored job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOutcome {
    /// Attempts remain: the job slept through its backoff and is `queued` again.
    Requeued { attempts: i32 },
    /// The attempt cap was reached: the job is terminally `failed`.
    DeadLettered { attempts: i32 },
}

/// Backoff before a retryable failure is requeued. Small by design: handlers
/// are bounded I/O, and the reaper guards true hangs.
pub fn backoff_delay(attempts: i32) -> Duration {
    let secs = 2f64.powi(attempts.max(0)).min(8.0);
    Duration::from_secs_f64(secs)
}

/// Errors are stored truncated so a pathological stack trace cannot bloat the row.
const MAX_ERROR_CHARS: usize = 2000;

fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_CHARS).collect()
}

#[derive(Clone)]
pub struct JobQueue {
    db: Db,
}

impl JobQueue {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Enqueue on a dedicated connection from the pool.
    ///
    /// Chain steps inside a stage handler must instead use [`enqueue_on`]
    /// with the handler's open transaction, so the next-stage job becomes
    /// visible atomically with the stage's own writes.
    ///
    /// [`enqueue_on`]: JobQueue::enqueue_on
    pub async fn enqueue(
        &self,
        job_type: &str,
        document_id: Option<Uuid>,
        payload: serde_json::Value,
        idempotency_key: Option<&str>,
    ) -> Result<EnqueueResult> {
        let mut conn = self.db.pool().acquire().await?;
        self.enqueue_on(&mut conn, job_type, document_id, payload, idempotency_key)
            .await
    }

    /// The single durability primitive: insert, or on idempotency-key
    /// conflict reset the row to `queued` with cleared error state and
    /// `attempts = 0`, overwriting `payload`, `document_id` and `type`.
    ///
    /// The reset is guarded so a job currently `working` is never yanked out
    /// from under its executor; such calls report [`EnqueueResult::InFlight`].
    pub async fn enqueue_on(
        &self,
        conn: &mut PgConnection,
        job_type: &str,
        document_id: Option<Uuid>,
        payload: serde_json::Value,
        idempotency_key: Option<&str>,
    ) -> Result<EnqueueResult> {
        let jobs = self.db.table("jobs");

        let upserted: Option<Uuid> = sqlx::query_scalar(&format!(
            r#"
            INSERT INTO {jobs} AS j (type, document_id, payload, status, attempts, idempotency_key)
            VALUES ($1, $2, $3, 'queued', 0, $4)
            ON CONFLICT (idempotency_key) DO UPDATE SET
                status = 'queued',
                attempts = 0,
                last_error = NULL,
                failed_at = NULL,
                payload = EXCLUDED.payload,
                document_id = EXCLUDED.document_id,
                type = EXCLUDED.type,
                updated_at = NOW()
            WHERE j.status <> 'working'
            RETURNING j.id
            "#
        ))
        .bind(job_type)
        .bind(document_id)
        .bind(&payload)
        .bind(idempotency_key)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(id) = upserted {
            return Ok(EnqueueResult::Queued(id));
        }

        // The guard blocked the reset: resolve the canonical id of the
        // in-flight row.
        let key = idempotency_key
            .ok_or_else(|| anyhow!("enqueue returned no row without an idempotency key"))?;
        let existing: Uuid =
            sqlx::query_scalar(&format!("SELECT id FROM {jobs} WHERE idempotency_key = $1"))
                .bind(key)
                .fetch_one(&mut *conn)
                .await?;

        Ok(EnqueueResult::InFlight(existing))
    }

    /// Atomically claim one queued job.
    ///
    /// Runs in a single transaction: reads the queued backlog size for
    /// observability, then selects the oldest unlocked `queued` row with
    /// `FOR UPDATE SKIP LOCKED` and flips it to `working`. Under N
    /// concurrent claimers each queued job is dispatched to at most one
    /// worker; ordering is FIFO modulo lock contention.
    pub async fn claim(&self) -> Result<(Option<Job>, i64)> {
        let jobs = self.db.table("jobs");
        let mut tx = self.db.pool().begin().await?;

        let queued_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {jobs} WHERE status = 'queued'"))
                .fetch_one(&mut *tx)
                .await?;

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            WITH next_job AS (
                SELECT id
                FROM {jobs}
                WHERE status = 'queued'
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE {jobs} AS j
            SET status = 'working', updated_at = NOW()
            FROM next_job
            WHERE j.id = next_job.id
            RETURNING {columns}
            "#,
            columns = qualified_columns("j"),
        ))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((job, queued_count))
    }

    /// Mark a job successfully completed.
    pub async fn finish(&self, job_id: Uuid) -> Result<()> {
        let jobs = self.db.table("jobs");
        sqlx::query(&format!(
            "UPDATE {jobs} SET status = 'done', updated_at = NOW() WHERE id = $1"
        ))
        .bind(job_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Apply the failure policy to an errored job.
    ///
    /// Bumps `attempts`; at the cap the job is dead-lettered as `failed`
    /// with `failed_at` set. Otherwise the worker sleeps through the capped
    /// exponential backoff here (the row stays `working` and keeps its
    /// heartbeat) before the job returns to `queued` for reclaim.
    pub async fn fail(&self, job: &Job, error: &str, max_attempts: i32) -> Result<FailOutcome> {
        let attempts = job.attempts + 1;
        let err = truncate_error(error);
        warn!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempts,
            error = %err,
            "job failure"
        );

        let jobs = self.db.table("jobs");
        if attempts >= max_attempts {
            sqlx::query(&format!(
                r#"
                UPDATE {jobs}
                SET status = 'failed', attempts = $1, last_error = $2,
                    failed_at = NOW(), updated_at = NOW()
                WHERE id = $3
                "#
            ))
            .bind(attempts)
            .bind(&err)
            .bind(job.id)
            .execute(self.db.pool())
            .await?;
            return Ok(FailOutcome::DeadLettered { attempts });
        }

        tokio::time::sleep(backoff_delay(attempts)).await;

        sqlx::query(&format!(
            r#"
            UPDATE {jobs}
            SET status = 'queued', attempts = $1, last_error = $2, updated_at = NOW()
            WHERE id = $3
            "#
        ))
        .bind(attempts)
        .bind(&err)
        .bind(job.id)
        .execute(self.db.pool())
        .await?;
        Ok(FailOutcome::Requeued { attempts })
    }

    /// Requeue `working` jobs whose heartbeat is older than the threshold.
    ///
    /// The worker that held them is presumed gone (crash, host loss, hung
    /// parse). Attempts are bumped so repeated staleness still converges to
    /// `failed` under the attempt cap.
    pub async fn reset_stale(&self, older_than: Duration) -> Result<u64> {
        let jobs = self.db.table("jobs");
        let result = sqlx::query(&format!(
            r#"
            UPDATE {jobs}
            SET status = 'queued',
                attempts = attempts + 1,
                last_error = COALESCE(last_error, '') || ' [reset-stale]',
                updated_at = NOW()
            WHERE status = 'working'
              AND updated_at < NOW() - ($1 * INTERVAL '1 second')
            "#
        ))
        .bind(older_than.as_secs() as i64)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Whether any `queued` or `working` job references the document.
    /// Drives the status endpoint's auto-heal rule.
    pub async fn has_active_job_for_document(&self, document_id: Uuid) -> Result<bool> {
        let jobs = self.db.table("jobs");
        let row: Option<i32> = sqlx::query_scalar(&format!(
            r#"
            SELECT 1 FROM {jobs}
            WHERE document_id = $1 AND status IN ('queued', 'working')
            LIMIT 1
            "#
        ))
        .bind(document_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.is_some())
    }

    /// Fetch a job by id.
    pub async fn find_by_id(&self, job_id: Uuid) -> Result<Job> {
        let jobs = self.db.table("jobs");
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM {jobs} WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(job)
    }
}

fn qualified_columns(alias: &str) -> String {
    JOB_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_result_helpers() {
        let queued = EnqueueResult::Queued(Uuid::new_v4());
        assert!(queued.is_queued());

        let in_flight = EnqueueResult::InFlight(Uuid::new_v4());
        assert!(!in_flight.is_queued());
        assert_eq!(in_flight.job_id(), in_flight.job_id());
    }

    #[test]
    fn backoff_doubles_then_caps_at_eight_seconds() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(6), Duration::from_secs(8));
    }

    #[test]
    fn errors_are_truncated_to_the_storage_cap() {
        let long = "x".repeat(5000);
        assert_eq!(truncate_error(&long).chars().count(), MAX_ERROR_CHARS);
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn qualified_columns_prefix_every_column() {
        let cols = qualified_columns("j");
        assert!(cols.starts_with("j.id"));
        assert!(cols.contains("j.idempotency_key"));
        assert!(!cols.contains(" type"));
    }
}
