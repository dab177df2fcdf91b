use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use uuid::Uuid;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Optional schema prefix for all table names; empty means unqualified.
    pub db_schema: String,
    /// Number of cooperative workers in the pool (floor 1).
    pub worker_parallelism: usize,
    /// Idle poll interval for workers, in milliseconds (floor 50).
    pub job_poll_interval_ms: u64,
    /// Idle-warning threshold for worker logging, in seconds.
    pub worker_stale_seconds: u64,
    /// Jobs stuck in `working` longer than this are requeued by the reaper.
    pub worker_stale_job_seconds: u64,
    /// Reaper period, in seconds (floor 5).
    pub worker_stale_check_interval_seconds: u64,
    /// Attempts after which a job is dead-lettered as `failed`.
    pub max_attempts: i32,
    pub embeddings_enabled: bool,
    /// Fallback owner for uploads when no auth is present.
    pub demo_user_id: Uuid,
    /// Object store endpoint; when unset the in-memory store is used (dev/test).
    pub storage_url: Option<String>,
    pub storage_service_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            db_schema: env::var("DB_SCHEMA").unwrap_or_default(),
            worker_parallelism: parse_or("WORKER_PARALLELISM", 1)?.max(1),
            job_poll_interval_ms: parse_or("JOB_POLL_INTERVAL_MS", 250)?.max(50),
            worker_stale_seconds: parse_or("WORKER_STALE_SECONDS", 30)?,
            worker_stale_job_seconds: parse_or("WORKER_STALE_JOB_SECONDS", 120)?,
            worker_stale_check_interval_seconds: parse_or(
                "WORKER_STALE_CHECK_INTERVAL_SECONDS",
                30,
            )?
            .max(5),
            max_attempts: parse_or("MAX_ATTEMPTS", 3)?,
            embeddings_enabled: env::var("EMBEDDINGS_ENABLED")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            demo_user_id: env::var("DEMO_USER_ID")
                .unwrap_or_else(|_| "00000000-0000-0000-0000-000000000001".to_string())
                .parse()
                .context("DEMO_USER_ID must be a valid UUID")?,
            storage_url: env::var("STORAGE_URL").ok(),
            storage_service_key: env::var("STORAGE_SERVICE_KEY").ok(),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_uses_default_when_unset() {
        assert_eq!(parse_or::<u64>("NO_SUCH_ENV_VAR_XYZ", 42).unwrap(), 42);
    }
}
