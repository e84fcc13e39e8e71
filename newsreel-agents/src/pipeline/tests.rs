use super::*;
use crate::mock::{MockAdapters, MockFailure, MockNews};
use newsreel_core::domain::run::{RunStatus, StageStatus, TriggerSource};
use std::sync::Mutex;
use uuid::Uuid;

fn settings() -> RunSettings {
    RunSettings {
        workdir: std::env::temp_dir().join(format!("newsreel-test-{}", Uuid::new_v4())),
        ..RunSettings::default()
    }
}

async fn execute(mocks: &MockAdapters, settings: RunSettings) -> PipelineRun {
    let pipeline = Pipeline::new(mocks.adapters(), settings);
    let mut run = PipelineRun::new(TriggerSource::Manual);
    pipeline.run(&mut run, &()).await;
    run
}

#[derive(Default)]
struct Recorder {
    updates: Mutex<Vec<(Option<Stage>, RunStatus)>>,
}

#[async_trait]
impl RunObserver for Recorder {
    async fn on_update(&self, run: &PipelineRun) {
        self.updates
            .lock()
            .unwrap()
            .push((run.current_stage, run.status));
    }
}

#[tokio::test]
async fn test_successful_run_produces_artifact_and_confirmation() {
    let mocks = MockAdapters::new();
    let run = execute(&mocks, settings()).await;

    assert_eq!(run.status, RunStatus::Succeeded);
    assert!(run.failure.is_none());
    assert!(
        run.stages
            .iter()
            .all(|s| s.status == StageStatus::Success)
    );

    let artifact = run.artifact.as_ref().unwrap();
    assert!(artifact.size_bytes > 0);
    assert!(artifact.path.ends_with(format!("{}.mp4", run.id)));

    let confirmation = run.upload.as_ref().and_then(|u| u.confirmation_id());
    assert_eq!(confirmation, Some("mock1"));

    // One segment per category
    assert_eq!(*mocks.video.assembled.lock().unwrap(), vec![Category::ALL.len()]);
    assert_eq!(mocks.uploader.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tts_timeout_fails_run_at_synthesis() {
    let mocks = MockAdapters::new();
    mocks.speech.state.fail_with(MockFailure::Hang);

    let run = execute(&mocks, settings()).await;

    assert_eq!(run.status, RunStatus::Failed);
    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::SynthesizeAudio);
    assert_eq!(failure.kind, ErrorKind::AdapterTimeout);

    // First attempt plus two retries, then the stage gives up
    assert_eq!(mocks.speech.state.calls(), 3);
    assert_eq!(mocks.media.state.calls(), 0);
    assert_eq!(mocks.video.state.calls(), 0);
    assert_eq!(mocks.uploader.state.calls(), 0);

    assert_eq!(run.stage(Stage::Translate).status, StageStatus::Success);
    for stage in [Stage::CollectMedia, Stage::Assemble, Stage::Upload] {
        assert_eq!(run.stage(stage).status, StageStatus::Skipped);
    }
    assert!(run.artifact.is_none());
}

#[tokio::test]
async fn test_assembly_failure_never_uploads() {
    let mocks = MockAdapters::new();
    mocks.video.state.fail_with(MockFailure::Rejected);

    let run = execute(&mocks, settings()).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Assemble);
    assert_eq!(failure.kind, ErrorKind::AssemblyFailure);
    // Assembly errors are not retried
    assert_eq!(mocks.video.state.calls(), 1);
    assert_eq!(mocks.uploader.state.calls(), 0);
    assert!(run.upload.is_none());
}

#[tokio::test]
async fn test_empty_video_is_an_assembly_failure() {
    let mocks = MockAdapters::new();
    mocks.video.state.fail_with(MockFailure::Empty);

    let run = execute(&mocks, settings()).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Assemble);
    assert_eq!(failure.kind, ErrorKind::AssemblyFailure);
    assert_eq!(mocks.uploader.state.calls(), 0);
}

#[tokio::test]
async fn test_no_articles_fails_collection() {
    let mocks = MockAdapters {
        news: Arc::new(MockNews::new(Vec::new())),
        ..MockAdapters::new()
    };

    let run = execute(&mocks, settings()).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Collect);
    assert_eq!(failure.kind, ErrorKind::ValidationFailure);
    assert_eq!(mocks.llm.state.calls(), 0);
    assert_eq!(run.stage(Stage::Process).status, StageStatus::Skipped);
}

#[tokio::test]
async fn test_unreachable_news_reports_adapter_error() {
    let mocks = MockAdapters::new();
    mocks.news.state.fail_with(MockFailure::Unavailable);

    let run = execute(&mocks, settings()).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Collect);
    assert_eq!(failure.kind, ErrorKind::AdapterUnavailable);
}

#[tokio::test]
async fn test_missing_categories_are_tolerated() {
    let mocks = MockAdapters {
        news: Arc::new(MockNews::new(vec![Category::Karnataka, Category::Kerala])),
        ..MockAdapters::new()
    };

    let run = execute(&mocks, settings()).await;

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(*mocks.video.assembled.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_too_few_segments_fails_collection() {
    let mocks = MockAdapters {
        news: Arc::new(MockNews::new(vec![Category::Karnataka])),
        ..MockAdapters::new()
    };
    let settings = RunSettings {
        min_segments: 3,
        ..settings()
    };

    let run = execute(&mocks, settings).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Collect);
    assert_eq!(failure.kind, ErrorKind::ValidationFailure);
    assert!(failure.message.contains("at least 3"));
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let mocks = MockAdapters {
        news: Arc::new(MockNews::new(vec![Category::National])),
        ..MockAdapters::new()
    };
    mocks.llm.state.fail_with(MockFailure::AuthFailure);

    let run = execute(&mocks, settings()).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Process);
    assert_eq!(failure.kind, ErrorKind::AdapterAuthFailure);
    assert_eq!(mocks.llm.state.calls(), 1);
}

#[tokio::test]
async fn test_empty_translation_fails_validation() {
    let mocks = MockAdapters::new();
    let pipeline = Pipeline::new(mocks.adapters(), settings());
    let mut segments = vec![ProcessedSegment::new(
        Category::National,
        "Budget passed".to_string(),
        "Parliament passed the budget.".to_string(),
        10.0,
    )];

    mocks.llm.state.fail_with(MockFailure::Empty);
    let err = pipeline.translate(&mut segments).await.unwrap_err();
    assert!(matches!(err, AdapterError::Validation(_)));
    assert!(segments[0].translation.is_none());
}

#[tokio::test]
async fn test_kannada_narration_starts_with_intro() {
    let mocks = MockAdapters::new();
    let pipeline = Pipeline::new(mocks.adapters(), settings());
    let mut segments = vec![ProcessedSegment::new(
        Category::Karnataka,
        "Metro line opens".to_string(),
        "The new metro line opens today.".to_string(),
        10.0,
    )];

    pipeline.translate(&mut segments).await.unwrap();
    let narration = segments[0].narration();
    assert!(narration.starts_with(kannada_intro(Category::Karnataka)));
}

#[tokio::test]
async fn test_upload_disabled_skips_upload() {
    let mocks = MockAdapters::new();
    let settings = RunSettings {
        upload_enabled: false,
        ..settings()
    };

    let run = execute(&mocks, settings).await;

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.stage(Stage::Upload).status, StageStatus::Skipped);
    assert!(matches!(run.upload, Some(UploadOutcome::Skipped { .. })));
    assert!(run.artifact.is_some());
    assert_eq!(mocks.uploader.state.calls(), 0);
}

#[tokio::test]
async fn test_rejected_upload_fails_run() {
    let mocks = MockAdapters::new();
    mocks.uploader.state.fail_with(MockFailure::Rejected);

    let run = execute(&mocks, settings()).await;

    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Upload);
    assert_eq!(failure.kind, ErrorKind::UploadRejected);
    // The artifact survives a failed upload
    assert!(run.artifact.is_some());
}

#[tokio::test]
async fn test_observer_sees_every_stage_in_order() {
    let mocks = MockAdapters::new();
    let pipeline = Pipeline::new(mocks.adapters(), settings());
    let recorder = Recorder::default();
    let mut run = PipelineRun::new(TriggerSource::Scheduled);

    pipeline.run(&mut run, &recorder).await;

    let updates = recorder.updates.lock().unwrap();
    let mut stages: Vec<Stage> = updates.iter().filter_map(|(stage, _)| *stage).collect();
    stages.dedup();
    assert_eq!(stages, Stage::ORDER.to_vec());
    assert_eq!(updates.first().map(|u| u.1), Some(RunStatus::Running));
    assert_eq!(updates.last().map(|u| u.1), Some(RunStatus::Succeeded));
}

#[tokio::test]
async fn test_probe_all_reports_every_adapter() {
    let mocks = MockAdapters::new();
    mocks.speech.state.set_unreachable(true);

    let health = mocks.adapters().probe_all().await;

    let names: Vec<&str> = health.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, ["news", "llm", "speech", "media", "video", "upload"]);
    let unreachable: Vec<&str> = health
        .iter()
        .filter(|h| h.status == newsreel_core::domain::health::Reachability::Unreachable)
        .map(|h| h.name.as_str())
        .collect();
    assert_eq!(unreachable, ["speech"]);
}
