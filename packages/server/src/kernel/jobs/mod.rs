//! Durable job queue and worker infrastructure.
//!
//! - [`Job`] / [`JobStatus`]: the queue row model
//! - [`JobQueue`]: enqueue upsert, skip-locked claim, finish/fail, staleness reset
//! - [`JobRegistry`]: job-type to handler dispatch
//! - [`WorkerPool`]: cooperative worker loop plus the stale-job reaper
//!
//! Business logic stays in the domains; this module only moves rows through
//! `queued → working → done|failed`.

mod job;
mod queue;
mod reaper;
mod registry;
mod worker;

pub use job::{Job, JobStatus};
pub use queue::{backoff_delay, EnqueueResult, FailOutcome, JobQueue};
pub use reaper::run_reaper;
pub use registry::{JobRegistry, SharedJobRegistry};
pub use worker::{WorkerPool, WorkerPoolConfig};
