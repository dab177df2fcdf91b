// Worker entry point: pipeline worker pool plus the stale-job reaper.

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::domains::documents::pipeline::register_stage_handlers;
use server_core::kernel::jobs::{JobRegistry, WorkerPool, WorkerPoolConfig};
use server_core::kernel::ServerDeps;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pipeline worker");

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections((config.worker_parallelism + 4) as u32)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let deps = Arc::new(ServerDeps::from_config(&config, pool));

    let mut registry = JobRegistry::new();
    register_stage_handlers(&mut registry);

    let worker_config = WorkerPoolConfig::from_config(&config);
    let pool = WorkerPool::new(deps, Arc::new(registry), worker_config);

    pool.run_until_shutdown().await
}
