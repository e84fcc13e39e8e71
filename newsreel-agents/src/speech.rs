//! Text-to-speech through the ElevenLabs API

use async_trait::async_trait;
use newsreel_core::domain::article::Category;
use newsreel_core::domain::health::ComponentHealth;
use newsreel_core::domain::segment::AudioRef;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::{AdapterError, Result};
use crate::http::check_response;
use crate::retry::RetryPolicy;

const ADAPTER: &str = "speech";

/// Requested output format; the duration estimate relies on its bitrate
const OUTPUT_FORMAT: &str = "mp3_44100_128";
const BITRATE_BPS: f64 = 128_000.0;

/// Renders narration audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` and writes the audio to `output`
    async fn synthesize(&self, text: &str, category: Category, output: &Path) -> Result<AudioRef>;

    async fn probe(&self) -> ComponentHealth;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl VoiceSettings {
    /// Configured voice, tuned for the category
    ///
    /// National and international segments get a steadier delivery;
    /// regional segments are closer to the source voice and slightly faster.
    pub fn for_category(config: &SpeechConfig, category: Category) -> Self {
        let mut settings = Self {
            stability: config.stability,
            similarity_boost: config.similarity,
            style: 0.0,
            use_speaker_boost: true,
            speed: 1.0,
        };

        match category {
            Category::International => settings.stability = settings.stability.max(0.6),
            Category::National => settings.stability = settings.stability.max(0.7),
            _ => {
                settings.similarity_boost = settings.similarity_boost.max(0.9);
                settings.speed = 1.1;
            }
        }

        settings
    }
}

/// Playback length of an MP3 of `size_bytes` at the requested bitrate
pub fn estimate_duration(size_bytes: usize) -> f64 {
    size_bytes as f64 * 8.0 / BITRATE_BPS
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

pub struct ElevenLabsClient {
    client: Client,
    policy: RetryPolicy,
    config: SpeechConfig,
}

impl ElevenLabsClient {
    pub fn new(client: Client, policy: RetryPolicy, config: SpeechConfig) -> Self {
        Self {
            client,
            policy,
            config,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential { adapter: ADAPTER })
    }

    async fn request_audio(&self, text: &str, settings: VoiceSettings) -> Result<Vec<u8>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.config.base_url, self.config.voice_id
            ))
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.config.model_id,
                voice_settings: settings,
            })
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;
        let response = check_response(ADAPTER, response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, category: Category, output: &Path) -> Result<AudioRef> {
        let settings = VoiceSettings::for_category(&self.config, category);
        let audio = self
            .policy
            .run(ADAPTER, || self.request_audio(text, settings))
            .await?;

        if audio.is_empty() {
            return Err(AdapterError::parse(ADAPTER, "empty audio response"));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &audio).await?;

        let duration_seconds = estimate_duration(audio.len());
        debug!(
            %category,
            path = %output.display(),
            bytes = audio.len(),
            duration_seconds,
            "Narration written"
        );

        Ok(AudioRef {
            path: output.to_path_buf(),
            duration_seconds,
        })
    }

    async fn probe(&self) -> ComponentHealth {
        let Ok(api_key) = self.api_key() else {
            return ComponentHealth::unreachable(ADAPTER, "credential not configured");
        };

        let probe = RetryPolicy::probe(self.policy.timeout);
        let result = probe
            .run(ADAPTER, || async move {
                let response = self
                    .client
                    .get(format!("{}/v1/user", self.config.base_url))
                    .header("xi-api-key", api_key)
                    .send()
                    .await
                    .map_err(|e| AdapterError::request(ADAPTER, e, probe.timeout))?;
                check_response(ADAPTER, response).await
            })
            .await;

        match result {
            Ok(_) => ComponentHealth::healthy(ADAPTER),
            Err(e) => ComponentHealth::unreachable(ADAPTER, e.to_string()),
        }
    }
}
