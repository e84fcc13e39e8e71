//! Application context
//!
//! Everything the service shares between the HTTP handlers, the scheduler
//! and running pipelines. Built once at startup and passed around as
//! `Arc<AppContext>`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use newsreel_agents::{Adapters, Pipeline, RunSettings};
use newsreel_core::domain::run::PipelineRun;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

use crate::config::ServiceConfig;
use crate::db;
use crate::guard::RunGuard;
use crate::logs::LogBuffer;
use crate::repository::run_repository::{InMemoryRunStore, PgRunStore, RunStore};

pub struct AppContext {
    pub config: ServiceConfig,
    pub pipeline: Pipeline,
    pub guard: RunGuard,
    pub runs: Arc<dyn RunStore>,
    /// Snapshot of the run in flight, refreshed on every stage transition
    pub current: RwLock<Option<PipelineRun>>,
    pub logs: LogBuffer,
    pub pool: Option<PgPool>,
    pub started_at: DateTime<Utc>,
    shutdown: watch::Sender<bool>,
}

impl AppContext {
    pub fn new(
        config: ServiceConfig,
        adapters: Adapters,
        runs: Arc<dyn RunStore>,
        logs: LogBuffer,
        pool: Option<PgPool>,
    ) -> Self {
        let settings = RunSettings::from_config(&config.agents);
        let (shutdown, _) = watch::channel(false);

        Self {
            pipeline: Pipeline::new(adapters, settings),
            guard: RunGuard::new(),
            runs,
            current: RwLock::new(None),
            logs,
            pool,
            started_at: Utc::now(),
            shutdown,
            config,
        }
    }

    /// Builds the production adapters and opens the run history
    pub async fn init(config: ServiceConfig, logs: LogBuffer) -> anyhow::Result<Arc<Self>> {
        let adapters =
            Adapters::from_config(&config.agents).context("Failed to build adapters")?;

        let (runs, pool): (Arc<dyn RunStore>, Option<PgPool>) = match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to database...");
                let pool = db::create_pool(url)
                    .await
                    .context("Failed to create database pool")?;
                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                (Arc::new(PgRunStore::new(pool.clone())), Some(pool))
            }
            None => {
                tracing::info!(
                    capacity = config.history_capacity,
                    "DATABASE_URL not set, keeping run history in memory"
                );
                (Arc::new(InMemoryRunStore::new(config.history_capacity)), None)
            }
        };

        Ok(Arc::new(Self::new(config, adapters, runs, logs, pool)))
    }

    /// Resolves once shutdown has begun
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stops the scheduler; a run in flight is left to finish
    pub fn begin_shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Shutting down");
        }
    }

    /// Stops the scheduler and closes the database pool
    pub async fn shutdown(&self) {
        self.begin_shutdown();
        if self.guard.is_busy() {
            tracing::warn!("A pipeline run is still in flight and will be abandoned");
        }
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

/// Waits until `begin_shutdown` is called
pub async fn stopped(mut signal: watch::Receiver<bool>) {
    let _ = signal.wait_for(|stopped| *stopped).await;
}
