//! Run DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::{
    PipelineRun, RunFailure, RunStatus, Stage, TriggerSource, UploadOutcome,
};

/// Outcome of a trigger request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOutcome {
    Started,
    Busy,
}

/// Response of `POST /pipeline/trigger`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub outcome: TriggerOutcome,
    /// Id of the started run, or of the run currently holding the guard
    pub run_id: Option<Uuid>,
    pub message: String,
}

/// Whether a run is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Idle,
    Running,
}

/// Aggregate run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
}

impl RunStats {
    /// Successful runs as a percentage of finished runs
    pub fn success_rate(&self) -> f64 {
        let finished = self.successes + self.failures;
        if finished == 0 {
            return 0.0;
        }
        self.successes as f64 / finished as f64 * 100.0
    }
}

/// Compact view of a run for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub trigger: TriggerSource,
    pub status: RunStatus,
    pub current_stage: Option<Stage>,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub upload: Option<UploadOutcome>,
    pub failure: Option<RunFailure>,
}

impl From<&PipelineRun> for RunSummary {
    fn from(run: &PipelineRun) -> Self {
        Self {
            id: run.id,
            trigger: run.trigger,
            status: run.status,
            current_stage: run.current_stage,
            requested_at: run.requested_at,
            completed_at: run.completed_at,
            duration_seconds: run.duration_seconds(),
            upload: run.upload.clone(),
            failure: run.failure.clone(),
        }
    }
}

/// Response of `GET /pipeline/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub state: ServiceState,
    pub current_run: Option<PipelineRun>,
    pub last_run: Option<PipelineRun>,
    pub stats: RunStats,
    /// Percentage of finished runs that succeeded
    pub success_rate: f64,
    pub recent_runs: Vec<RunSummary>,
}
