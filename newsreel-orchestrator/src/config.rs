//! Service configuration
//!
//! Scheduling, HTTP, storage and logging settings of the orchestrator, plus
//! the adapter settings handed to the pipeline.

use anyhow::{Context, bail};
use newsreel_agents::AgentsConfig;
use newsreel_agents::config::{env_flag, env_opt, env_or};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    /// Time between scheduled runs
    pub run_interval: Duration,
    pub run_on_startup: bool,
    /// Postgres run history; runs are kept in memory when unset
    pub database_url: Option<String>,
    /// Only probed for reachability
    pub redis_url: Option<String>,
    pub history_capacity: usize,
    pub log_capacity: usize,
    pub log_dir: PathBuf,
    pub agents: AgentsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            run_interval: Duration::from_secs(6 * 3600),
            run_on_startup: false,
            database_url: None,
            redis_url: None,
            history_capacity: 50,
            log_capacity: 1000,
            log_dir: PathBuf::from("./logs"),
            agents: AgentsConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let interval_hours: u64 = env_or(
            "PIPELINE_RUN_INTERVAL_HOURS",
            defaults.run_interval.as_secs() / 3600,
        );

        let config = Self {
            bind_addr: env_opt("BIND_ADDR").unwrap_or(defaults.bind_addr),
            run_interval: Duration::from_secs(interval_hours * 3600),
            run_on_startup: env_flag("RUN_ON_STARTUP", defaults.run_on_startup),
            database_url: env_opt("DATABASE_URL"),
            redis_url: env_opt("REDIS_URL"),
            history_capacity: env_or("RUN_HISTORY_CAPACITY", defaults.history_capacity),
            log_capacity: env_or("LOG_TAIL_CAPACITY", defaults.log_capacity),
            log_dir: env_opt("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            agents: AgentsConfig::from_env().context("Invalid adapter configuration")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.run_interval.is_zero() {
            bail!("PIPELINE_RUN_INTERVAL_HOURS must be at least 1");
        }
        if self.history_capacity == 0 {
            bail!("RUN_HISTORY_CAPACITY must be at least 1");
        }
        if self.log_capacity == 0 {
            bail!("LOG_TAIL_CAPACITY must be at least 1");
        }
        if let Some(redis) = &self.redis_url {
            url::Url::parse(redis).with_context(|| format!("Invalid REDIS_URL: {}", redis))?;
        }
        self.agents.validate()
    }

    pub fn run_interval_hours(&self) -> u64 {
        self.run_interval.as_secs() / 3600
    }
}
