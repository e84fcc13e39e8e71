//! Pipeline run domain types
//!
//! A `PipelineRun` is created when a run is triggered and is mutated by the
//! pipeline as stages complete. Stage transitions go through methods on the
//! run so the fixed stage order cannot be violated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One named step of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Collect,
    Process,
    Translate,
    SynthesizeAudio,
    CollectMedia,
    Assemble,
    Upload,
}

impl Stage {
    /// Fixed execution order of every run
    pub const ORDER: [Stage; 7] = [
        Stage::Collect,
        Stage::Process,
        Stage::Translate,
        Stage::SynthesizeAudio,
        Stage::CollectMedia,
        Stage::Assemble,
        Stage::Upload,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Process => "process",
            Stage::Translate => "translate",
            Stage::SynthesizeAudio => "synthesize-audio",
            Stage::CollectMedia => "collect-media",
            Stage::Assemble => "assemble",
            Stage::Upload => "upload",
        }
    }

    pub fn index(&self) -> usize {
        Stage::ORDER
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    /// The stage that must have succeeded before this one may begin
    pub fn precondition(&self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| Stage::ORDER[i])
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Status of a single stage within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Scheduled,
    Manual,
}

/// Classification of the error that failed a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AdapterTimeout,
    AdapterAuthFailure,
    AdapterRateLimited,
    /// Credential missing, transport failure or unexpected API response
    AdapterUnavailable,
    ValidationFailure,
    AssemblyFailure,
    UploadRejected,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::AdapterTimeout => "adapter_timeout",
            ErrorKind::AdapterAuthFailure => "adapter_auth_failure",
            ErrorKind::AdapterRateLimited => "adapter_rate_limited",
            ErrorKind::AdapterUnavailable => "adapter_unavailable",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::AssemblyFailure => "assembly_failure",
            ErrorKind::UploadRejected => "upload_rejected",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Progress of one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message for failed stages, reason for skipped ones
    pub message: Option<String>,
}

/// Where and why a run failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

/// The assembled video file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub size_bytes: u64,
    /// Still frame offered as the custom thumbnail
    #[serde(default)]
    pub thumbnail: Option<PathBuf>,
}

/// Result of the upload stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadOutcome {
    Uploaded {
        video_id: String,
        url: String,
        uploaded_at: DateTime<Utc>,
        #[serde(default)]
        thumbnail_set: bool,
    },
    Skipped {
        reason: String,
    },
}

impl UploadOutcome {
    /// Platform confirmation id, when the video was uploaded
    pub fn confirmation_id(&self) -> Option<&str> {
        match self {
            UploadOutcome::Uploaded { video_id, .. } => Some(video_id),
            UploadOutcome::Skipped { .. } => None,
        }
    }
}

/// One end-to-end execution of the stage sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub trigger: TriggerSource,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub current_stage: Option<Stage>,
    pub stages: Vec<StageRecord>,
    pub artifact: Option<VideoArtifact>,
    pub upload: Option<UploadOutcome>,
    pub failure: Option<RunFailure>,
}

/// Rejected stage transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The run already succeeded or failed
    RunFinished(Uuid),
    /// The stage was already started, finished or skipped
    StageNotPending { stage: Stage, status: StageStatus },
    /// The stage was not running
    StageNotRunning { stage: Stage, status: StageStatus },
    /// The preceding stage has not succeeded
    PreconditionNotMet { stage: Stage, blocked_by: Stage },
    /// Some stages have not completed
    Incomplete(Stage),
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::RunFinished(id) => write!(f, "run {} has already finished", id),
            TransitionError::StageNotPending { stage, status } => {
                write!(f, "stage '{}' is not pending (status: {:?})", stage, status)
            }
            TransitionError::StageNotRunning { stage, status } => {
                write!(f, "stage '{}' is not running (status: {:?})", stage, status)
            }
            TransitionError::PreconditionNotMet { stage, blocked_by } => write!(
                f,
                "stage '{}' cannot begin before '{}' succeeds",
                stage, blocked_by
            ),
            TransitionError::Incomplete(stage) => {
                write!(f, "stage '{}' has not completed", stage)
            }
        }
    }
}

impl std::error::Error for TransitionError {}

impl PipelineRun {
    /// Creates a pending run with every stage pending
    pub fn new(trigger: TriggerSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            requested_at: Utc::now(),
            started_at: None,
            completed_at: None,
            status: RunStatus::Pending,
            current_stage: None,
            stages: Stage::ORDER
                .iter()
                .map(|&stage| StageRecord {
                    stage,
                    status: StageStatus::Pending,
                    started_at: None,
                    completed_at: None,
                    message: None,
                })
                .collect(),
            artifact: None,
            upload: None,
            failure: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> &StageRecord {
        &self.stages[stage.index()]
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut StageRecord {
        &mut self.stages[stage.index()]
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock seconds between start and completion
    pub fn duration_seconds(&self) -> Option<f64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        Some((completed - started).num_milliseconds() as f64 / 1000.0)
    }

    fn check_can_enter(&self, stage: Stage) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::RunFinished(self.id));
        }

        let record = self.stage(stage);
        if record.status != StageStatus::Pending {
            return Err(TransitionError::StageNotPending {
                stage,
                status: record.status,
            });
        }

        if let Some(previous) = stage.precondition() {
            if self.stage(previous).status != StageStatus::Success {
                return Err(TransitionError::PreconditionNotMet {
                    stage,
                    blocked_by: previous,
                });
            }
        }

        Ok(())
    }

    /// Marks `stage` as running; the preceding stage must have succeeded
    pub fn begin_stage(&mut self, stage: Stage) -> Result<(), TransitionError> {
        self.check_can_enter(stage)?;

        let now = Utc::now();
        self.status = RunStatus::Running;
        self.started_at.get_or_insert(now);
        self.current_stage = Some(stage);

        let record = self.stage_mut(stage);
        record.status = StageStatus::Running;
        record.started_at = Some(now);

        Ok(())
    }

    /// Marks a running stage as successful
    pub fn complete_stage(&mut self, stage: Stage) -> Result<(), TransitionError> {
        let record = self.stage_mut(stage);
        if record.status != StageStatus::Running {
            return Err(TransitionError::StageNotRunning {
                stage,
                status: record.status,
            });
        }

        record.status = StageStatus::Success;
        record.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Skips a pending stage whose precondition succeeded (e.g. upload disabled)
    pub fn skip_stage(
        &mut self,
        stage: Stage,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.check_can_enter(stage)?;

        let now = Utc::now();
        self.status = RunStatus::Running;
        self.started_at.get_or_insert(now);
        self.current_stage = Some(stage);

        let record = self.stage_mut(stage);
        record.status = StageStatus::Skipped;
        record.completed_at = Some(now);
        record.message = Some(reason.into());

        Ok(())
    }

    /// Fails the run at `stage` and skips every later stage
    pub fn fail_stage(&mut self, stage: Stage, kind: ErrorKind, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }

        let message = message.into();
        let now = Utc::now();

        let record = self.stage_mut(stage);
        record.status = StageStatus::Failed;
        record.started_at.get_or_insert(now);
        record.completed_at = Some(now);
        record.message = Some(message.clone());

        for downstream in &mut self.stages[stage.index() + 1..] {
            if downstream.status == StageStatus::Pending {
                downstream.status = StageStatus::Skipped;
                downstream.message = Some(format!("skipped after '{}' failed", stage));
            }
        }

        self.status = RunStatus::Failed;
        self.started_at.get_or_insert(now);
        self.completed_at = Some(now);
        self.current_stage = Some(stage);
        self.failure = Some(RunFailure {
            stage,
            kind,
            message,
        });
    }

    /// Fails the run at whatever stage it reached
    pub fn abort(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let stage = self.current_stage.unwrap_or(Stage::Collect);
        self.fail_stage(stage, kind, message);
    }

    /// Marks the run succeeded once every stage succeeded or was skipped
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::RunFinished(self.id));
        }

        if let Some(open) = self
            .stages
            .iter()
            .find(|r| !matches!(r.status, StageStatus::Success | StageStatus::Skipped))
        {
            return Err(TransitionError::Incomplete(open.stage));
        }

        self.status = RunStatus::Succeeded;
        self.completed_at = Some(Utc::now());
        self.current_stage = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_through(run: &mut PipelineRun, last: Stage) {
        for stage in Stage::ORDER.iter().take(last.index() + 1) {
            run.begin_stage(*stage).unwrap();
            run.complete_stage(*stage).unwrap();
        }
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = PipelineRun::new(TriggerSource::Manual);
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.stages.len(), Stage::ORDER.len());
        assert!(run.stages.iter().all(|r| r.status == StageStatus::Pending));
    }

    #[test]
    fn test_stage_cannot_begin_before_precondition() {
        let mut run = PipelineRun::new(TriggerSource::Manual);
        let err = run.begin_stage(Stage::Translate).unwrap_err();
        assert_eq!(
            err,
            TransitionError::PreconditionNotMet {
                stage: Stage::Translate,
                blocked_by: Stage::Process
            }
        );
        assert_eq!(run.status, RunStatus::Pending);
    }

    #[test]
    fn test_stage_cannot_begin_while_precondition_running() {
        let mut run = PipelineRun::new(TriggerSource::Manual);
        run.begin_stage(Stage::Collect).unwrap();
        assert!(run.begin_stage(Stage::Process).is_err());
    }

    #[test]
    fn test_full_run_succeeds() {
        let mut run = PipelineRun::new(TriggerSource::Scheduled);
        run_through(&mut run, Stage::Upload);
        run.finish().unwrap();

        assert_eq!(run.status, RunStatus::Succeeded);
        assert!(run.completed_at.is_some());
        assert!(run.current_stage.is_none());
    }

    #[test]
    fn test_finish_requires_all_stages() {
        let mut run = PipelineRun::new(TriggerSource::Manual);
        run_through(&mut run, Stage::Assemble);
        assert_eq!(run.finish(), Err(TransitionError::Incomplete(Stage::Upload)));
    }

    #[test]
    fn test_skipped_upload_still_finishes() {
        let mut run = PipelineRun::new(TriggerSource::Manual);
        run_through(&mut run, Stage::Assemble);
        run.skip_stage(Stage::Upload, "upload disabled").unwrap();
        run.finish().unwrap();

        assert_eq!(run.stage(Stage::Upload).status, StageStatus::Skipped);
        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[test]
    fn test_failure_skips_downstream_stages() {
        let mut run = PipelineRun::new(TriggerSource::Manual);
        run_through(&mut run, Stage::Translate);
        run.begin_stage(Stage::SynthesizeAudio).unwrap();
        run.fail_stage(Stage::SynthesizeAudio, ErrorKind::AdapterTimeout, "timed out");

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.stage(Stage::SynthesizeAudio).status, StageStatus::Failed);
        for stage in [Stage::CollectMedia, Stage::Assemble, Stage::Upload] {
            assert_eq!(run.stage(stage).status, StageStatus::Skipped);
        }
        assert_eq!(
            run.failure,
            Some(RunFailure {
                stage: Stage::SynthesizeAudio,
                kind: ErrorKind::AdapterTimeout,
                message: "timed out".to_string()
            })
        );
        assert!(run.begin_stage(Stage::CollectMedia).is_err());
    }

    #[test]
    fn test_abort_uses_current_stage() {
        let mut run = PipelineRun::new(TriggerSource::Manual);
        run_through(&mut run, Stage::Collect);
        run.begin_stage(Stage::Process).unwrap();
        run.abort(ErrorKind::Internal, "task panicked");

        assert_eq!(run.failure.as_ref().map(|f| f.stage), Some(Stage::Process));
    }

    #[test]
    fn test_stage_names_serialize_kebab_case() {
        let json = serde_json::to_string(&Stage::SynthesizeAudio).unwrap();
        assert_eq!(json, "\"synthesize-audio\"");
        assert_eq!(Stage::CollectMedia.name(), "collect-media");
    }

    #[test]
    fn test_precondition_order() {
        assert_eq!(Stage::Collect.precondition(), None);
        assert_eq!(Stage::Upload.precondition(), Some(Stage::Assemble));
    }

    #[test]
    fn test_upload_outcome_confirmation() {
        let uploaded = UploadOutcome::Uploaded {
            video_id: "abc123".to_string(),
            url: "https://youtu.be/abc123".to_string(),
            uploaded_at: Utc::now(),
            thumbnail_set: true,
        };
        assert_eq!(uploaded.confirmation_id(), Some("abc123"));

        let skipped = UploadOutcome::Skipped {
            reason: "disabled".to_string(),
        };
        assert_eq!(skipped.confirmation_id(), None);
    }

    #[test]
    fn test_records_without_thumbnail_fields_still_decode() {
        let upload: UploadOutcome = serde_json::from_str(
            r#"{"status":"uploaded","video_id":"abc","url":"https://youtu.be/abc","uploaded_at":"2026-10-17T06:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(upload, UploadOutcome::Uploaded { thumbnail_set: false, .. }));

        let artifact: VideoArtifact = serde_json::from_str(
            r#"{"path":"/data/video/run.mp4","duration_seconds":60.0,"width":1080,"height":1920,"fps":30,"size_bytes":1024}"#,
        )
        .unwrap();
        assert_eq!(artifact.thumbnail, None);
    }
}
