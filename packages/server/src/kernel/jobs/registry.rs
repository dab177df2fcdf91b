//! Registry mapping job type strings to stage handlers.
//!
//! The worker claims raw rows from the queue and uses this registry to
//! dispatch them without knowing the concrete stage implementations.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::job::Job;
use crate::kernel::ServerDeps;

/// Type alias for the async handler function.
///
/// Handlers receive the claimed job row and the shared dependencies. They are
/// required to be idempotent and to commit their artifact writes together
/// with the next-stage enqueue; they never mark their own job done or failed.
type BoxedHandler = Box<
    dyn Fn(Job, Arc<ServerDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct JobRegistry {
    registrations: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Register a handler for a job type.
    pub fn register<F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        F: Fn(Job, Arc<ServerDeps>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.registrations
            .insert(job_type, Box::new(move |job, deps| Box::pin(handler(job, deps))));
    }

    /// Execute a claimed job through its registered handler.
    pub async fn execute(&self, job: Job, deps: Arc<ServerDeps>) -> Result<()> {
        let handler = self
            .registrations
            .get(job.job_type.as_str())
            .ok_or_else(|| anyhow!("no handler for type={}", job.job_type))?;
        handler(job, deps).await
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.registrations.contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.registrations.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedJobRegistry = Arc<JobRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_check() {
        let mut registry = JobRegistry::new();
        registry.register("PARSE_DOC", |_job, _deps| async move { Ok(()) });

        assert!(registry.is_registered("PARSE_DOC"));
        assert!(!registry.is_registered("UNKNOWN"));
        assert!(registry.registered_types().contains(&"PARSE_DOC"));
    }
}
