//! Worker pool for processing pipeline jobs.
//!
//! A pool of P cooperative workers plus one stale-job reaper. Workers share
//! no in-memory state; all coordination goes through the job table.
//!
//! ```text
//! worker[i]
//!     │
//!     ├─► JobQueue::claim()          (skip-locked, at most one holder)
//!     ├─► JobRegistry::execute()     (idempotent stage handler)
//!     └─► finish / fail              (retry with backoff, dead-letter at cap)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::queue::JobQueue;
use super::registry::SharedJobRegistry;
use crate::config::Config;
use crate::kernel::ServerDeps;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of cooperative workers.
    pub parallelism: usize,
    /// Sleep between claims when the queue is empty.
    pub poll_interval: Duration,
    /// Log a warning after this much continuous idleness.
    pub idle_warn_after: Duration,
    /// Attempts after which a job is dead-lettered.
    pub max_attempts: i32,
    /// `working` rows older than this are requeued by the reaper.
    pub stale_job_after: Duration,
    /// Reaper period.
    pub reaper_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            poll_interval: Duration::from_millis(250),
            idle_warn_after: Duration::from_secs(30),
            max_attempts: 3,
            stale_job_after: Duration::from_secs(120),
            reaper_interval: Duration::from_secs(30),
        }
    }
}

impl WorkerPoolConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallelism: config.worker_parallelism.max(1),
            poll_interval: Duration::from_millis(config.job_poll_interval_ms.max(50)),
            idle_warn_after: Duration::from_secs(config.worker_stale_seconds),
            max_attempts: config.max_attempts,
            stale_job_after: Duration::from_secs(config.worker_stale_job_seconds),
            reaper_interval: Duration::from_secs(config.worker_stale_check_interval_seconds.max(5)),
        }
    }
}

/// The worker pool service.
pub struct WorkerPool {
    queue: JobQueue,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(deps: Arc<ServerDeps>, registry: SharedJobRegistry, config: WorkerPoolConfig) -> Self {
        Self {
            queue: deps.jobs.clone(),
            registry,
            deps,
            config,
        }
    }

    /// Run workers and reaper until the shutdown token fires.
    ///
    /// On shutdown, workers stop taking new jobs; a worker cancelled mid
    /// handler leaves its job `working` for the reaper to recover on next
    /// boot rather than marking it.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            parallelism = self.config.parallelism,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "starting worker pool"
        );

        let mut tasks = Vec::with_capacity(self.config.parallelism + 1);
        for worker_id in 1..=self.config.parallelism {
            tasks.push(tokio::spawn(worker_loop(
                worker_id,
                self.queue.clone(),
                self.registry.clone(),
                self.deps.clone(),
                self.config.clone(),
                shutdown.clone(),
            )));
        }
        tasks.push(tokio::spawn(super::reaper::run_reaper(
            self.queue.clone(),
            self.config.reaper_interval,
            self.config.stale_job_after,
            shutdown.clone(),
        )));

        futures::future::join_all(tasks).await;

        info!("worker pool stopped");
        Ok(())
    }

    /// Run until a Ctrl+C signal is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = CancellationToken::new();

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            signal_token.cancel();
        });

        self.run(shutdown).await
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: JobQueue,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: WorkerPoolConfig,
    shutdown: CancellationToken,
) {
    let mut idle_since: Option<Instant> = None;

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let (claimed, queued_count) = match queue.claim().await {
            Ok(result) => result,
            Err(e) => {
                error!(worker_id, error = %e, "database error during claim");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
                continue;
            }
        };

        let Some(job) = claimed else {
            if queued_count > 0 {
                warn!(
                    worker_id,
                    queued_count,
                    "found queued jobs but couldn't claim any (may be locked by another worker)"
                );
            }
            let now = Instant::now();
            match idle_since {
                None => idle_since = Some(now),
                Some(since) if now.duration_since(since) >= config.idle_warn_after => {
                    warn!(
                        worker_id,
                        idle_secs = now.duration_since(since).as_secs(),
                        "worker idle (no queued jobs found)"
                    );
                    idle_since = Some(now);
                }
                Some(_) => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(config.poll_interval) => {}
            }
            continue;
        };

        idle_since = None;
        let job_id = job.id;
        let job_type = job.job_type.clone();
        info!(worker_id, job_id = %job_id, job_type = %job_type, "claimed job");

        if !registry.is_registered(&job_type) {
            error!(worker_id, job_id = %job_id, job_type = %job_type, "handler missing");
            if let Err(e) = queue
                .fail(&job, &format!("no handler for type={job_type}"), config.max_attempts)
                .await
            {
                error!(job_id = %job_id, error = %e, "failed to mark job as failed");
            }
            continue;
        }

        // A worker cancelled during a handler must not mark the job: the row
        // stays `working` and is recovered by the reaper.
        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(worker_id, job_id = %job_id, "cancelled during handler");
                break;
            }
            result = registry.execute(job.clone(), deps.clone()) => result,
        };

        match result {
            Ok(()) => {
                if let Err(e) = queue.finish(job_id).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as done");
                } else {
                    info!(worker_id, job_id = %job_id, job_type = %job_type, "finished job");
                }
            }
            Err(e) => {
                if let Err(mark_err) = queue.fail(&job, &e.to_string(), config.max_attempts).await {
                    error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
                }
            }
        }
    }

    info!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = WorkerPoolConfig::default();
        assert_eq!(config.parallelism, 1);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }
}
