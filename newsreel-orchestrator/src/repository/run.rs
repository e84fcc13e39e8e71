//! Run Repository
//!
//! Stores pipeline runs. A run is saved when it is created and again after
//! every stage transition, so the latest save always reflects its state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsreel_core::domain::run::{
    PipelineRun, RunFailure, RunStatus, StageRecord, UploadOutcome, VideoArtifact,
};
use newsreel_core::dto::run::RunStats;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Inserts the run or replaces the stored copy with the same id
    async fn save(&self, run: &PipelineRun) -> Result<(), sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<PipelineRun>, sqlx::Error>;

    /// Most recent runs first
    async fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>, sqlx::Error>;

    /// The most recently requested run that has finished
    async fn last_finished(&self) -> Result<Option<PipelineRun>, sqlx::Error>;

    async fn stats(&self) -> Result<RunStats, sqlx::Error>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct History {
    /// Oldest first
    runs: VecDeque<PipelineRun>,
    stats: RunStats,
}

impl History {
    fn count_finished(&mut self, status: RunStatus) {
        match status {
            RunStatus::Succeeded => self.stats.successes += 1,
            RunStatus::Failed => self.stats.failures += 1,
            RunStatus::Pending | RunStatus::Running => {}
        }
    }
}

/// Keeps the last `capacity` runs
///
/// Counters cover every run seen since startup, including evicted ones.
pub struct InMemoryRunStore {
    history: RwLock<History>,
    capacity: usize,
}

impl InMemoryRunStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: RwLock::new(History::default()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save(&self, run: &PipelineRun) -> Result<(), sqlx::Error> {
        let mut history = self.history.write().await;

        if let Some(stored) = history.runs.iter_mut().find(|r| r.id == run.id) {
            let was_terminal = stored.is_terminal();
            *stored = run.clone();
            if !was_terminal {
                history.count_finished(run.status);
            }
            return Ok(());
        }

        history.stats.runs += 1;
        history.count_finished(run.status);
        history.runs.push_back(run.clone());
        while history.runs.len() > self.capacity {
            history.runs.pop_front();
        }

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<PipelineRun>, sqlx::Error> {
        let history = self.history.read().await;
        Ok(history.runs.iter().find(|r| r.id == id).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>, sqlx::Error> {
        let history = self.history.read().await;
        Ok(history.runs.iter().rev().take(limit).cloned().collect())
    }

    async fn last_finished(&self) -> Result<Option<PipelineRun>, sqlx::Error> {
        let history = self.history.read().await;
        Ok(history.runs.iter().rev().find(|r| r.is_terminal()).cloned())
    }

    async fn stats(&self) -> Result<RunStats, sqlx::Error> {
        Ok(self.history.read().await.stats)
    }
}

// =============================================================================
// Postgres store
// =============================================================================

pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_RUN: &str = r#"
    SELECT id, trigger, status, current_stage, requested_at, started_at,
           completed_at, stages, artifact, upload, failure
    FROM pipeline_runs
"#;

#[async_trait]
impl RunStore for PgRunStore {
    async fn save(&self, run: &PipelineRun) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (id, trigger, status, current_stage, requested_at,
                                       started_at, completed_at, stages, artifact, upload, failure)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status,
                current_stage = EXCLUDED.current_stage,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                stages = EXCLUDED.stages,
                artifact = EXCLUDED.artifact,
                upload = EXCLUDED.upload,
                failure = EXCLUDED.failure
            "#,
        )
        .bind(run.id)
        .bind(to_text(&run.trigger))
        .bind(to_text(&run.status))
        .bind(run.current_stage.as_ref().map(to_text))
        .bind(run.requested_at)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(Json(&run.stages))
        .bind(run.artifact.as_ref().map(Json))
        .bind(run.upload.as_ref().map(Json))
        .bind(run.failure.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<PipelineRun>, sqlx::Error> {
        let row = sqlx::query_as::<_, RunRow>(&format!("{} WHERE id = $1", SELECT_RUN))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PipelineRun::try_from).transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RunRow>(&format!(
            "{} ORDER BY requested_at DESC LIMIT $1",
            SELECT_RUN
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PipelineRun::try_from).collect()
    }

    async fn last_finished(&self) -> Result<Option<PipelineRun>, sqlx::Error> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "{} WHERE status IN ('succeeded', 'failed') ORDER BY requested_at DESC LIMIT 1",
            SELECT_RUN
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(PipelineRun::try_from).transpose()
    }

    async fn stats(&self) -> Result<RunStats, sqlx::Error> {
        let (runs, successes, failures): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'succeeded'),
                   COUNT(*) FILTER (WHERE status = 'failed')
            FROM pipeline_runs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RunStats {
            runs: runs as u64,
            successes: successes as u64,
            failures: failures as u64,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Serialized name of a unit enum variant, e.g. `"synthesize-audio"`
fn to_text<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn from_text<T: DeserializeOwned>(column: &str, value: String) -> Result<T, sqlx::Error> {
    serde_json::from_value(serde_json::Value::String(value)).map_err(|e| {
        sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        }
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    trigger: String,
    status: String,
    current_stage: Option<String>,
    requested_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    stages: Json<Vec<StageRecord>>,
    artifact: Option<Json<VideoArtifact>>,
    upload: Option<Json<UploadOutcome>>,
    failure: Option<Json<RunFailure>>,
}

impl TryFrom<RunRow> for PipelineRun {
    type Error = sqlx::Error;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(PipelineRun {
            id: row.id,
            trigger: from_text("trigger", row.trigger)?,
            status: from_text("status", row.status)?,
            current_stage: row
                .current_stage
                .map(|s| from_text("current_stage", s))
                .transpose()?,
            requested_at: row.requested_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            stages: row.stages.0,
            artifact: row.artifact.map(|j| j.0),
            upload: row.upload.map(|j| j.0),
            failure: row.failure.map(|j| j.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_core::domain::run::{ErrorKind, Stage, TriggerSource};

    fn finished(status: RunStatus) -> PipelineRun {
        let mut run = PipelineRun::new(TriggerSource::Scheduled);
        match status {
            RunStatus::Failed => run.fail_stage(Stage::Collect, ErrorKind::ValidationFailure, "no news"),
            _ => run.status = status,
        }
        run
    }

    #[tokio::test]
    async fn test_save_replaces_existing_run() {
        let store = InMemoryRunStore::new(10);
        let mut run = PipelineRun::new(TriggerSource::Manual);
        store.save(&run).await.unwrap();

        run.begin_stage(Stage::Collect).unwrap();
        store.save(&run).await.unwrap();

        let stored = store.find(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Running);
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
        assert_eq!(store.stats().await.unwrap().runs, 1);
    }

    #[tokio::test]
    async fn test_finished_runs_are_counted_once() {
        let store = InMemoryRunStore::new(10);
        let mut run = PipelineRun::new(TriggerSource::Manual);
        store.save(&run).await.unwrap();

        run.fail_stage(Stage::Translate, ErrorKind::AdapterTimeout, "timed out");
        store.save(&run).await.unwrap();
        store.save(&run).await.unwrap();

        store.save(&finished(RunStatus::Succeeded)).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.successes, 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let store = InMemoryRunStore::new(3);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let run = finished(RunStatus::Failed);
            ids.push(run.id);
            store.save(&run).await.unwrap();
        }

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, ids[4]);
        assert!(store.find(ids[0]).await.unwrap().is_none());
        // Counters survive eviction
        assert_eq!(store.stats().await.unwrap().runs, 5);
    }

    #[tokio::test]
    async fn test_last_finished_skips_running_run() {
        let store = InMemoryRunStore::new(10);
        let done = finished(RunStatus::Succeeded);
        store.save(&done).await.unwrap();

        let mut current = PipelineRun::new(TriggerSource::Manual);
        current.begin_stage(Stage::Collect).unwrap();
        store.save(&current).await.unwrap();

        let last = store.last_finished().await.unwrap().unwrap();
        assert_eq!(last.id, done.id);
    }

    #[test]
    fn test_stage_names_round_trip_through_text() {
        let text = to_text(&Stage::SynthesizeAudio);
        assert_eq!(text, "synthesize-audio");
        let stage: Stage = from_text("current_stage", text).unwrap();
        assert_eq!(stage, Stage::SynthesizeAudio);
        assert!(from_text::<RunStatus>("status", "exploded".to_string()).is_err());
    }
}
