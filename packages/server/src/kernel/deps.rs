//! Server dependency container.
//!
//! Holds the database handle, the job queue, and trait objects for the
//! external collaborators (object store, parsers, embedder) so domain code
//! and tests receive the same interface.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::common::Db;
use crate::config::Config;
use crate::kernel::embedding::ZeroVectorEmbedder;
use crate::kernel::jobs::JobQueue;
use crate::kernel::parsing::BuiltinStructuredParser;
use crate::kernel::storage::{BlobStore, HttpBlobStore, MemoryBlobStore};
use crate::kernel::traits::{Embedder, StructuredParser};

#[derive(Clone)]
pub struct ServerDeps {
    pub db: Db,
    pub jobs: JobQueue,
    pub blob_store: Arc<dyn BlobStore>,
    pub structured_parser: Arc<dyn StructuredParser>,
    pub embedder: Arc<dyn Embedder>,
    pub embeddings_enabled: bool,
    /// Fallback owner for uploads when no auth is present.
    pub demo_user_id: Uuid,
    pub max_attempts: i32,
}

impl ServerDeps {
    pub fn new(
        db: Db,
        blob_store: Arc<dyn BlobStore>,
        structured_parser: Arc<dyn StructuredParser>,
        embedder: Arc<dyn Embedder>,
        embeddings_enabled: bool,
        demo_user_id: Uuid,
        max_attempts: i32,
    ) -> Self {
        Self {
            jobs: JobQueue::new(db.clone()),
            db,
            blob_store,
            structured_parser,
            embedder,
            embeddings_enabled,
            demo_user_id,
            max_attempts,
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(config: &Config, pool: PgPool) -> Self {
        let db = Db::new(pool, config.db_schema.clone());

        let blob_store: Arc<dyn BlobStore> =
            match (&config.storage_url, &config.storage_service_key) {
                (Some(url), Some(key)) => Arc::new(HttpBlobStore::new(url, key)),
                _ => {
                    warn!("STORAGE_URL not configured; using in-memory blob store");
                    MemoryBlobStore::new()
                }
            };

        Self::new(
            db,
            blob_store,
            Arc::new(BuiltinStructuredParser::default()),
            Arc::new(ZeroVectorEmbedder::default()),
            config.embeddings_enabled,
            config.demo_user_id,
            config.max_attempts,
        )
    }
}
