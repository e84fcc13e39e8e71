//! In-memory adapter doubles
//!
//! Every mock counts its calls, can be told to fail in a given way and can
//! be held at a [`Gate`] so tests can observe a run while it is in flight.
//! Calls go through a short [`RetryPolicy`], so a hanging mock exercises the
//! real timeout and retry path.

use async_trait::async_trait;
use chrono::Utc;
use newsreel_core::domain::article::{Article, Category, engagement_score};
use newsreel_core::domain::health::ComponentHealth;
use newsreel_core::domain::run::{UploadOutcome, VideoArtifact};
use newsreel_core::domain::segment::{AudioRef, ImageRef, ProcessedSegment};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{AdapterError, Result};
use crate::llm::{LanguageModel, WORDS_PER_SECOND};
use crate::media::MediaCollector;
use crate::news::NewsSource;
use crate::pipeline::Adapters;
use crate::retry::RetryPolicy;
use crate::speech::SpeechSynthesizer;
use crate::upload::{Uploader, VideoMetadata};
use crate::video::VideoAssembler;

/// How a mock misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Never answers; the retry policy times the call out
    Hang,
    AuthFailure,
    RateLimited,
    Unavailable,
    /// The platform refuses the request
    Rejected,
    /// Answers successfully with empty output
    Empty,
    /// Panics inside the call
    Panic,
}

impl MockFailure {
    fn error(self, adapter: &'static str) -> Option<AdapterError> {
        match self {
            MockFailure::Hang | MockFailure::Empty | MockFailure::Panic => None,
            MockFailure::AuthFailure => Some(AdapterError::AuthFailure {
                adapter,
                message: "invalid api key".to_string(),
            }),
            MockFailure::RateLimited => Some(AdapterError::RateLimited {
                adapter,
                retry_after: None,
            }),
            MockFailure::Unavailable => Some(AdapterError::Api {
                adapter,
                status: 503,
                message: "service unavailable".to_string(),
            }),
            MockFailure::Rejected => Some(match adapter {
                "video" => AdapterError::Assembly("ffmpeg exited with code 1".to_string()),
                _ => AdapterError::UploadRejected("quota exceeded".to_string()),
            }),
        }
    }
}

/// Holds calls until opened
#[derive(Debug)]
pub struct Gate {
    permits: Semaphore,
    waiting: AtomicUsize,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            permits: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
        }
    }
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Lets every current and future call through
    pub fn open(&self) {
        self.permits.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    /// Number of calls that have reached the gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Waits until at least one call is held at the gate
    pub async fn reached(&self) {
        while self.waiting() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn pass(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.permits.acquire().await {
            drop(permit);
        }
    }
}

/// Call counter, failure mode and gate shared by every mock
#[derive(Debug)]
pub struct MockState {
    adapter: &'static str,
    calls: AtomicUsize,
    failure: Mutex<Option<MockFailure>>,
    gate: Mutex<Option<Arc<Gate>>>,
    unreachable: AtomicBool,
    policy: RetryPolicy,
}

impl MockState {
    fn new(adapter: &'static str) -> Self {
        Self {
            adapter,
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            gate: Mutex::new(None),
            unreachable: AtomicBool::new(false),
            policy: fast_policy(),
        }
    }

    /// Attempts made so far, retries included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, failure: MockFailure) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(failure);
        }
    }

    /// Clears the failure mode
    pub fn recover(&self) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = None;
        }
    }

    pub fn hold_at(&self, gate: Arc<Gate>) {
        if let Ok(mut slot) = self.gate.lock() {
            *slot = Some(gate);
        }
    }

    /// Makes `probe` report the adapter unreachable
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn failure(&self) -> Option<MockFailure> {
        self.failure.lock().ok().and_then(|f| *f)
    }

    fn returns_empty(&self) -> bool {
        self.failure() == Some(MockFailure::Empty)
    }

    /// Runs one call: waits at the gate, then applies the failure mode
    /// under the retry policy
    async fn call(&self) -> Result<()> {
        let gate = self.gate.lock().ok().and_then(|g| g.clone());
        if let Some(gate) = gate {
            gate.pass().await;
        }

        self.policy
            .run(self.adapter, || async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let failure = self.failure();
                match failure {
                    Some(MockFailure::Hang) => std::future::pending::<()>().await,
                    Some(MockFailure::Panic) => panic!("{} adapter panicked", self.adapter),
                    _ => {}
                }
                match failure.and_then(|f| f.error(self.adapter)) {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            })
            .await
    }

    fn probe(&self) -> ComponentHealth {
        if self.unreachable.load(Ordering::SeqCst) {
            ComponentHealth::unreachable(self.adapter, "connection refused")
        } else {
            ComponentHealth::healthy(self.adapter)
        }
    }
}

/// Short timeout and backoff so failing tests stay fast
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_millis(100),
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

/// A plausible article for `category`
pub fn sample_article(category: Category) -> Article {
    let title = format!("Breaking: {} council announces flood relief", category.display_name());
    Article {
        source_id: "mock".to_string(),
        engagement_score: engagement_score(&title),
        body: "Officials said relief camps opened across affected districts on Monday. \
               Rescue teams moved families to safer ground as rivers rose."
            .to_string(),
        title,
        category,
        published_at: Utc::now(),
        url: Some(format!("https://news.example/{}", category)),
    }
}

pub struct MockNews {
    pub state: MockState,
    categories: Vec<Category>,
}

impl MockNews {
    /// One article for each of `categories`
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            state: MockState::new("news"),
            categories,
        }
    }
}

impl Default for MockNews {
    fn default() -> Self {
        Self::new(Category::ALL.to_vec())
    }
}

#[async_trait]
impl NewsSource for MockNews {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn fetch(&self, category: Category) -> Result<Vec<Article>> {
        self.state.call().await?;
        if self.state.returns_empty() || !self.categories.contains(&category) {
            return Ok(Vec::new());
        }
        Ok(vec![sample_article(category)])
    }

    async fn probe(&self) -> ComponentHealth {
        self.state.probe()
    }
}

pub struct MockLanguageModel {
    pub state: MockState,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self {
            state: MockState::new("llm"),
        }
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn summarize(&self, article: &Article, target_words: usize) -> Result<String> {
        self.state.call().await?;
        if self.state.returns_empty() {
            return Ok(String::new());
        }
        let content = article.content();
        let words: Vec<&str> = content.split_whitespace().take(target_words.max(1)).collect();
        Ok(words.join(" "))
    }

    async fn translate(&self, text: &str, _category: Category) -> Result<String> {
        self.state.call().await?;
        if self.state.returns_empty() {
            return Ok(String::new());
        }
        let words = text.split_whitespace().count();
        Ok(vec!["ಸುದ್ದಿ"; words.max(1)].join(" "))
    }

    async fn probe(&self) -> ComponentHealth {
        self.state.probe()
    }
}

pub struct MockSpeech {
    pub state: MockState,
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self {
            state: MockState::new("speech"),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, _category: Category, output: &Path) -> Result<AudioRef> {
        self.state.call().await?;
        let duration_seconds = if self.state.returns_empty() {
            0.0
        } else {
            text.split_whitespace().count() as f64 / WORDS_PER_SECOND
        };
        Ok(AudioRef {
            path: output.to_path_buf(),
            duration_seconds,
        })
    }

    async fn probe(&self) -> ComponentHealth {
        self.state.probe()
    }
}

pub struct MockMedia {
    pub state: MockState,
}

impl Default for MockMedia {
    fn default() -> Self {
        Self {
            state: MockState::new("media"),
        }
    }
}

#[async_trait]
impl MediaCollector for MockMedia {
    async fn collect(
        &self,
        segment: &ProcessedSegment,
        count: usize,
        cache_dir: &Path,
    ) -> Result<Vec<ImageRef>> {
        self.state.call().await?;
        if self.state.returns_empty() {
            return Ok(Vec::new());
        }
        Ok((0..count)
            .map(|i| ImageRef {
                id: format!("{}-{}", segment.category, i),
                provider: "mock".to_string(),
                url: format!("https://images.example/{}/{}.jpg", segment.category, i),
                description: None,
                local_path: Some(cache_dir.join(format!("{}_{}.jpg", segment.category, i))),
            })
            .collect())
    }

    async fn probe(&self) -> ComponentHealth {
        self.state.probe()
    }
}

pub struct MockVideo {
    pub state: MockState,
    /// Segment count of every assembled video
    pub assembled: Mutex<Vec<usize>>,
}

impl Default for MockVideo {
    fn default() -> Self {
        Self {
            state: MockState::new("video"),
            assembled: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VideoAssembler for MockVideo {
    async fn assemble(&self, segments: &[ProcessedSegment], output: &Path) -> Result<VideoArtifact> {
        self.state.call().await?;
        if let Ok(mut assembled) = self.assembled.lock() {
            assembled.push(segments.len());
        }
        Ok(VideoArtifact {
            path: output.to_path_buf(),
            duration_seconds: segments.iter().map(|s| s.duration_seconds).sum(),
            width: 1080,
            height: 1920,
            fps: 30,
            size_bytes: if self.state.returns_empty() { 0 } else { 4 * 1024 * 1024 },
            thumbnail: None,
        })
    }

    async fn probe(&self) -> ComponentHealth {
        self.state.probe()
    }
}

pub struct MockUploader {
    pub state: MockState,
    /// Metadata of every accepted upload
    pub uploads: Mutex<Vec<VideoMetadata>>,
}

impl Default for MockUploader {
    fn default() -> Self {
        Self {
            state: MockState::new("upload"),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, _artifact: &VideoArtifact, metadata: &VideoMetadata) -> Result<UploadOutcome> {
        self.state.call().await?;
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(metadata.clone());
        }
        let video_id = if self.state.returns_empty() {
            String::new()
        } else {
            format!("mock{}", self.state.calls())
        };
        Ok(UploadOutcome::Uploaded {
            url: format!("https://youtu.be/{}", video_id),
            video_id,
            uploaded_at: Utc::now(),
            thumbnail_set: false,
        })
    }

    async fn probe(&self) -> ComponentHealth {
        self.state.probe()
    }
}

/// One of each mock, kept as concrete types for inspection
#[derive(Clone, Default)]
pub struct MockAdapters {
    pub news: Arc<MockNews>,
    pub llm: Arc<MockLanguageModel>,
    pub speech: Arc<MockSpeech>,
    pub media: Arc<MockMedia>,
    pub video: Arc<MockVideo>,
    pub uploader: Arc<MockUploader>,
}

impl MockAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same mocks as pipeline adapters
    pub fn adapters(&self) -> Adapters {
        Adapters {
            news: self.news.clone(),
            llm: self.llm.clone(),
            speech: self.speech.clone(),
            media: self.media.clone(),
            video: self.video.clone(),
            uploader: self.uploader.clone(),
        }
    }

    /// Holds every run at the collect stage until the gate opens
    pub fn gated(self) -> (Self, Arc<Gate>) {
        let gate = Gate::new();
        self.news.state.hold_at(gate.clone());
        (self, gate)
    }
}
