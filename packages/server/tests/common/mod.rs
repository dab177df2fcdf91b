//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is started for the whole test run; each harness
//! gets its own freshly-migrated database on it, so queue-level tests cannot
//! observe each other's jobs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use server_core::common::Db;
use server_core::domains::documents::models::DocumentStatus;
use server_core::domains::documents::pipeline::register_stage_handlers;
use server_core::kernel::jobs::{JobRegistry, WorkerPool, WorkerPoolConfig};
use server_core::kernel::{
    BuiltinStructuredParser, MemoryBlobStore, ServerDeps, ZeroVectorEmbedder,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shared test infrastructure that persists across all tests in a binary.
struct SharedTestInfra {
    host: String,
    port: u16,
    _postgres: ContainerAsync<GenericImage>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with RUST_LOG=debug cargo test -- --nocapture to see logs.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = GenericImage::new("postgres", "16-alpine")
            .with_wait_for(testcontainers::core::WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_exposed_port(testcontainers::core::ContainerPort::Tcp(5432))
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_DB", "postgres")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?.to_string();
        let port = postgres.get_host_port_ipv4(5432).await?;

        Ok(Self {
            host,
            port,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static SharedTestInfra {
        SHARED_INFRA
            .get_or_try_init(Self::init)
            .await
            .expect("test infrastructure")
    }
}

/// Create a fresh migrated database on the shared container.
async fn fresh_pool() -> PgPool {
    let infra = SharedTestInfra::get().await;
    let admin_url = format!(
        "postgresql://postgres:postgres@{}:{}/postgres",
        infra.host, infra.port
    );
    let admin = PgPool::connect(&admin_url).await.expect("admin connection");

    let db_name = format!("t_{}", Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE DATABASE {db_name}"))
        .execute(&admin)
        .await
        .expect("create test database");
    admin.close().await;

    let url = format!(
        "postgresql://postgres:postgres@{}:{}/{}",
        infra.host, infra.port, db_name
    );
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("test database connection");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

pub struct TestApp {
    pub deps: Arc<ServerDeps>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_embeddings(false).await
    }

    pub async fn with_embeddings(embeddings_enabled: bool) -> Self {
        let pool = fresh_pool().await;
        let db = Db::new(pool, "");
        let deps = Arc::new(ServerDeps::new(
            db,
            MemoryBlobStore::new(),
            Arc::new(BuiltinStructuredParser),
            Arc::new(ZeroVectorEmbedder::default()),
            embeddings_enabled,
            Uuid::new_v4(),
            3,
        ));
        Self { deps }
    }

    pub fn pool(&self) -> &PgPool {
        self.deps.db.pool()
    }

    /// Spawn the full worker pool (stage handlers + reaper). Cancel the
    /// returned token to stop it.
    pub fn start_workers(&self, parallelism: usize) -> CancellationToken {
        let mut registry = JobRegistry::new();
        register_stage_handlers(&mut registry);

        let config = WorkerPoolConfig {
            parallelism,
            poll_interval: Duration::from_millis(50),
            idle_warn_after: Duration::from_secs(30),
            max_attempts: 3,
            stale_job_after: Duration::from_secs(120),
            reaper_interval: Duration::from_secs(5),
        };
        let pool = WorkerPool::new(self.deps.clone(), Arc::new(registry), config);

        let token = CancellationToken::new();
        let run_token = token.clone();
        tokio::spawn(async move {
            let _ = pool.run(run_token).await;
        });
        token
    }

    /// Poll the document row until it reaches the wanted status.
    pub async fn wait_for_status(
        &self,
        document_id: Uuid,
        wanted: DocumentStatus,
        timeout: Duration,
    ) {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut last: Option<DocumentStatus> = None;
        while tokio::time::Instant::now() < deadline {
            let status: Option<DocumentStatus> =
                sqlx::query_scalar("SELECT status FROM documents WHERE id = $1")
                    .bind(document_id)
                    .fetch_optional(self.pool())
                    .await
                    .expect("status query");
            if status == Some(wanted) {
                return;
            }
            last = status;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("document {document_id} never reached {wanted:?}; last seen {last:?}");
    }
}

/// A PDF-like text fixture: 200+ lines of term-sheet prose containing the
/// clause keywords the extractor looks for.
pub fn term_sheet_fixture() -> Vec<u8> {
    let mut lines = Vec::new();
    lines.push("SERIES A TERM SHEET".to_string());
    lines.push(String::new());
    lines.push("1. Transfer Restrictions".to_string());
    lines.push(String::new());
    lines.push(
        "Each holder of shares is bound by the drag along clause set out in this \
         agreement, requiring all holders to join an approved sale."
            .to_string(),
    );
    lines.push(String::new());
    lines.push(
        "The investors shall have a right of first refusal over any proposed \
         transfer of founder shares, exercisable within thirty days."
            .to_string(),
    );
    lines.push(String::new());
    lines.push(
        "The preferred shares carry anti-dilution protection on a broad-based \
         weighted average basis."
            .to_string(),
    );
    lines.push(String::new());
    for i in 0..220 {
        lines.push(format!(
            "Additional provision {i}: the parties acknowledge the obligations \
             described in schedule {i} and agree to act in good faith."
        ));
    }
    lines.join("\n").into_bytes()
}
