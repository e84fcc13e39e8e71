//! Pipeline executor
//!
//! Drives one `PipelineRun` through the fixed stage order. Each stage feeds
//! the next and its output is validated before the run moves on. The first
//! failure settles the run: the failed stage is recorded with its error
//! kind, every later stage is skipped and its adapter is never called.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{join_all, try_join_all};
use newsreel_core::domain::article::{Article, Category};
use newsreel_core::domain::health::ComponentHealth;
use newsreel_core::domain::run::{
    ErrorKind, PipelineRun, RunFailure, Stage, UploadOutcome, VideoArtifact,
};
use newsreel_core::domain::segment::{ProcessedSegment, allocate_durations};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::config::AgentsConfig;
use crate::error::{AdapterError, Result};
use crate::http::build_client;
use crate::llm::{
    LanguageModel, OpenAiClient, fit_to_duration, kannada_intro, validate_translation, word_budget,
};
use crate::media::{MediaCollector, StockMediaCollector};
use crate::news::{CompositeNewsSource, NewsApiSource, NewsSource, RssNewsSource, select_top};
use crate::speech::{ElevenLabsClient, SpeechSynthesizer};
use crate::upload::{Uploader, VideoMetadata, YouTubeUploader};
use crate::video::{FfmpegAssembler, VideoAssembler};

#[cfg(test)]
mod tests;

/// Receives the run after every stage transition
#[async_trait]
pub trait RunObserver: Send + Sync {
    async fn on_update(&self, run: &PipelineRun);
}

/// Ignores updates
#[async_trait]
impl RunObserver for () {
    async fn on_update(&self, _run: &PipelineRun) {}
}

/// The external services a run depends on
#[derive(Clone)]
pub struct Adapters {
    pub news: Arc<dyn NewsSource>,
    pub llm: Arc<dyn LanguageModel>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub media: Arc<dyn MediaCollector>,
    pub video: Arc<dyn VideoAssembler>,
    pub uploader: Arc<dyn Uploader>,
}

impl Adapters {
    /// Builds the production adapters sharing one HTTP client
    pub fn from_config(config: &AgentsConfig) -> anyhow::Result<Self> {
        let client = build_client(config.http.timeout)?;
        let policy = config.http;

        let mut sources: Vec<Box<dyn NewsSource>> =
            vec![Box::new(RssNewsSource::new(client.clone(), policy))];
        if config.news.api_key.is_some() {
            sources.push(Box::new(NewsApiSource::new(
                client.clone(),
                policy,
                config.news.api_key.clone(),
            )));
        }

        Ok(Self {
            news: Arc::new(CompositeNewsSource::new(sources)),
            llm: Arc::new(OpenAiClient::new(client.clone(), policy, config.llm.clone())),
            speech: Arc::new(ElevenLabsClient::new(
                client.clone(),
                policy,
                config.speech.clone(),
            )),
            media: Arc::new(StockMediaCollector::from_config(
                client.clone(),
                policy,
                &config.media,
            )),
            video: Arc::new(FfmpegAssembler::new(config.video.clone())),
            uploader: Arc::new(YouTubeUploader::new(client, policy, config.upload.clone())),
        })
    }

    /// Probes every adapter concurrently
    pub async fn probe_all(&self) -> Vec<ComponentHealth> {
        let (news, llm, speech, media, video, upload) = tokio::join!(
            self.news.probe(),
            self.llm.probe(),
            self.speech.probe(),
            self.media.probe(),
            self.video.probe(),
            self.uploader.probe(),
        );
        vec![news, llm, speech, media, video, upload]
    }
}

/// Settings that shape a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub max_per_category: usize,
    pub min_segments: usize,
    pub images_per_segment: usize,
    /// Seconds shared among the news segments
    pub target_duration_seconds: f64,
    pub target_language: String,
    pub upload_enabled: bool,
    pub workdir: PathBuf,
}

impl RunSettings {
    pub fn from_config(config: &AgentsConfig) -> Self {
        Self {
            max_per_category: config.news.max_per_category,
            min_segments: config.pipeline.min_segments,
            images_per_segment: config.media.images_per_segment,
            target_duration_seconds: config.video.content_seconds(),
            target_language: config.llm.target_language.clone(),
            upload_enabled: config.upload.enabled,
            workdir: config.pipeline.workdir.clone(),
        }
    }

    fn is_kannada(&self) -> bool {
        self.target_language.eq_ignore_ascii_case("kannada")
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&AgentsConfig::default())
    }
}

/// Maps an adapter error into the failure recorded for `stage`
fn failed_at(stage: Stage) -> impl Fn(AdapterError) -> RunFailure {
    move |e| RunFailure {
        stage,
        kind: e.kind(),
        message: e.to_string(),
    }
}

pub struct Pipeline {
    adapters: Adapters,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(adapters: Adapters, settings: RunSettings) -> Self {
        Self { adapters, settings }
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Executes every stage of `run` once and settles it
    ///
    /// On return the run is either succeeded, with an artifact and an upload
    /// outcome, or failed with the stage and error kind that stopped it.
    pub async fn run(&self, run: &mut PipelineRun, observer: &dyn RunObserver) {
        let span = info_span!("pipeline_run", run_id = %run.id);

        async {
            info!(trigger = ?run.trigger, "Pipeline run started");

            match self.execute(run, observer).await {
                Ok(()) => {
                    if let Err(e) = run.finish() {
                        run.abort(ErrorKind::Internal, e.to_string());
                    }
                }
                Err(failure) => run.fail_stage(failure.stage, failure.kind, failure.message),
            }

            match &run.failure {
                None => info!(
                    duration_seconds = ?run.duration_seconds(),
                    confirmation = ?run.upload.as_ref().and_then(|u| u.confirmation_id()),
                    "Pipeline run succeeded"
                ),
                Some(failure) => error!(
                    stage = %failure.stage,
                    kind = %failure.kind,
                    "Pipeline run failed: {}",
                    failure.message
                ),
            }

            observer.on_update(run).await;
        }
        .instrument(span)
        .await
    }

    async fn enter(
        &self,
        run: &mut PipelineRun,
        observer: &dyn RunObserver,
        stage: Stage,
    ) -> std::result::Result<(), RunFailure> {
        run.begin_stage(stage).map_err(|e| RunFailure {
            stage,
            kind: ErrorKind::Internal,
            message: e.to_string(),
        })?;
        debug!(%stage, "Stage started");
        observer.on_update(run).await;
        Ok(())
    }

    async fn leave(
        &self,
        run: &mut PipelineRun,
        observer: &dyn RunObserver,
        stage: Stage,
    ) -> std::result::Result<(), RunFailure> {
        run.complete_stage(stage).map_err(|e| RunFailure {
            stage,
            kind: ErrorKind::Internal,
            message: e.to_string(),
        })?;
        info!(%stage, "Stage completed");
        observer.on_update(run).await;
        Ok(())
    }

    async fn execute(
        &self,
        run: &mut PipelineRun,
        observer: &dyn RunObserver,
    ) -> std::result::Result<(), RunFailure> {
        self.enter(run, observer, Stage::Collect).await?;
        let articles = self.collect().await.map_err(failed_at(Stage::Collect))?;
        self.leave(run, observer, Stage::Collect).await?;

        self.enter(run, observer, Stage::Process).await?;
        let mut segments = self
            .process(&articles)
            .await
            .map_err(failed_at(Stage::Process))?;
        self.leave(run, observer, Stage::Process).await?;

        self.enter(run, observer, Stage::Translate).await?;
        self.translate(&mut segments)
            .await
            .map_err(failed_at(Stage::Translate))?;
        self.leave(run, observer, Stage::Translate).await?;

        self.enter(run, observer, Stage::SynthesizeAudio).await?;
        self.synthesize(&mut segments, run.id.to_string())
            .await
            .map_err(failed_at(Stage::SynthesizeAudio))?;
        self.leave(run, observer, Stage::SynthesizeAudio).await?;

        self.enter(run, observer, Stage::CollectMedia).await?;
        self.collect_media(&mut segments)
            .await
            .map_err(failed_at(Stage::CollectMedia))?;
        self.leave(run, observer, Stage::CollectMedia).await?;

        self.enter(run, observer, Stage::Assemble).await?;
        let artifact = self
            .assemble(&segments, run.id.to_string())
            .await
            .map_err(failed_at(Stage::Assemble))?;
        run.artifact = Some(artifact.clone());
        self.leave(run, observer, Stage::Assemble).await?;

        if !self.settings.upload_enabled {
            let reason = "video upload disabled".to_string();
            run.skip_stage(Stage::Upload, reason.clone())
                .map_err(|e| RunFailure {
                    stage: Stage::Upload,
                    kind: ErrorKind::Internal,
                    message: e.to_string(),
                })?;
            run.upload = Some(UploadOutcome::Skipped { reason });
            info!("Upload skipped: disabled");
            observer.on_update(run).await;
            return Ok(());
        }

        self.enter(run, observer, Stage::Upload).await?;
        let outcome = self
            .upload(&segments, &artifact)
            .await
            .map_err(failed_at(Stage::Upload))?;
        run.upload = Some(outcome);
        self.leave(run, observer, Stage::Upload).await?;

        Ok(())
    }

    /// Top articles per category, in category order
    ///
    /// A category whose sources are all unreachable is left out; the stage
    /// only fails when too few articles remain.
    #[instrument(skip_all, fields(stage = "collect"))]
    async fn collect(&self) -> Result<Vec<Article>> {
        let news = &self.adapters.news;
        let results = join_all(Category::ALL.iter().map(|c| news.fetch(*c))).await;

        let mut selected = Vec::new();
        let mut last_error = None;

        for (category, result) in Category::ALL.iter().zip(results) {
            match result {
                Ok(articles) => {
                    let top = select_top(articles, self.settings.max_per_category);
                    if top.is_empty() {
                        warn!(%category, "No articles found");
                    }
                    selected.extend(top);
                }
                Err(e) => {
                    warn!(%category, "News collection failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if selected.len() < self.settings.min_segments {
            if let Some(e) = last_error.filter(|_| selected.is_empty()) {
                return Err(e);
            }
            return Err(AdapterError::Validation(format!(
                "collected {} articles, at least {} required",
                selected.len(),
                self.settings.min_segments
            )));
        }

        info!(articles = selected.len(), "News collected");
        Ok(selected)
    }

    #[instrument(skip_all, fields(stage = "process"))]
    async fn process(&self, articles: &[Article]) -> Result<Vec<ProcessedSegment>> {
        if articles.is_empty() {
            return Err(AdapterError::Validation("no articles to process".to_string()));
        }

        let categories: Vec<Category> = articles.iter().map(|a| a.category).collect();
        let durations = allocate_durations(&categories, self.settings.target_duration_seconds);

        let llm = &self.adapters.llm;
        let summaries = try_join_all(
            articles
                .iter()
                .zip(&durations)
                .map(|(article, seconds)| llm.summarize(article, word_budget(*seconds))),
        )
        .await?;

        articles
            .iter()
            .zip(durations)
            .zip(summaries)
            .map(|((article, seconds), summary)| {
                let summary = fit_to_duration(&summary, seconds);
                if summary.is_empty() {
                    return Err(AdapterError::Validation(format!(
                        "empty summary for {} article '{}'",
                        article.category, article.title
                    )));
                }
                debug!(
                    category = %article.category,
                    words = summary.split_whitespace().count(),
                    seconds,
                    "Summary ready"
                );
                Ok(ProcessedSegment::new(
                    article.category,
                    article.title.clone(),
                    summary,
                    seconds,
                ))
            })
            .collect()
    }

    #[instrument(skip_all, fields(stage = "translate", language = %self.settings.target_language))]
    async fn translate(&self, segments: &mut [ProcessedSegment]) -> Result<()> {
        let llm = &self.adapters.llm;
        let translations = try_join_all(
            segments
                .iter()
                .map(|segment| llm.translate(&segment.summary, segment.category)),
        )
        .await?;

        for (segment, translation) in segments.iter_mut().zip(translations) {
            validate_translation(&translation, &self.settings.target_language).map_err(|e| {
                AdapterError::Validation(format!("{} segment: {}", segment.category, e))
            })?;

            segment.translation = Some(if self.settings.is_kannada() {
                format!("{} {}", kannada_intro(segment.category), translation)
            } else {
                translation
            });
        }

        Ok(())
    }

    /// Segments are narrated one at a time to stay within provider rate limits
    #[instrument(skip_all, fields(stage = "synthesize-audio"))]
    async fn synthesize(&self, segments: &mut [ProcessedSegment], run_id: String) -> Result<()> {
        let audio_dir = self.settings.workdir.join("audio").join(run_id);

        for (index, segment) in segments.iter_mut().enumerate() {
            let path = audio_dir.join(format!("{:02}_{}.mp3", index, segment.category));
            let audio = self
                .adapters
                .speech
                .synthesize(segment.narration(), segment.category, &path)
                .await?;

            if audio.duration_seconds <= 0.0 {
                return Err(AdapterError::Validation(format!(
                    "empty narration for {} segment",
                    segment.category
                )));
            }
            segment.audio = Some(audio);
        }

        Ok(())
    }

    #[instrument(skip_all, fields(stage = "collect-media"))]
    async fn collect_media(&self, segments: &mut [ProcessedSegment]) -> Result<()> {
        let media_dir = self.settings.workdir.join("media");

        for segment in segments.iter_mut() {
            let images = self
                .adapters
                .media
                .collect(segment, self.settings.images_per_segment, &media_dir)
                .await?;

            if images.is_empty() {
                return Err(AdapterError::Validation(format!(
                    "no images found for {} segment",
                    segment.category
                )));
            }
            segment.images = images;
        }

        Ok(())
    }

    #[instrument(skip_all, fields(stage = "assemble"))]
    async fn assemble(&self, segments: &[ProcessedSegment], run_id: String) -> Result<VideoArtifact> {
        let output = self
            .settings
            .workdir
            .join("video")
            .join(format!("{}.mp4", run_id));
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let artifact = self.adapters.video.assemble(segments, &output).await?;
        if artifact.size_bytes == 0 {
            return Err(AdapterError::Assembly(format!(
                "{} is empty",
                artifact.path.display()
            )));
        }

        Ok(artifact)
    }

    #[instrument(skip_all, fields(stage = "upload"))]
    async fn upload(
        &self,
        segments: &[ProcessedSegment],
        artifact: &VideoArtifact,
    ) -> Result<UploadOutcome> {
        let mut categories: Vec<Category> = segments.iter().map(|s| s.category).collect();
        categories.dedup();

        let metadata = VideoMetadata::for_categories(&categories, Utc::now());
        let outcome = self.adapters.uploader.upload(artifact, &metadata).await?;

        match outcome.confirmation_id() {
            Some(id) if !id.is_empty() => Ok(outcome),
            _ => Err(AdapterError::UploadRejected(
                "platform returned no confirmation id".to_string(),
            )),
        }
    }
}
