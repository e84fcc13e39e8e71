//! Adapter configuration
//!
//! One typed struct per provider, all loaded from environment variables.
//! Optional credentials stay `None` when unset or empty; the matching
//! adapter then reports itself unreachable instead of failing at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::video::{INTRO_SECONDS, OUTRO_SECONDS};

/// Reads an optional variable, treating empty values as unset
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads and parses a variable, falling back to `default` when unset or invalid
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_flag(key: &str, default: bool) -> bool {
    match env_opt(key).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// News collection settings
#[derive(Debug, Clone)]
pub struct NewsConfig {
    /// NewsAPI key; RSS feeds are used alone when unset
    pub api_key: Option<String>,
    pub max_per_category: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_per_category: 1,
        }
    }
}

/// Summarization and translation settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub target_language: String,
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            target_language: "Kannada".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Text-to-speech settings
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity: f32,
    pub base_url: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity: 0.8,
            base_url: "https://api.elevenlabs.io".to_string(),
        }
    }
}

/// Stock image search settings
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub unsplash_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub images_per_segment: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            unsplash_api_key: None,
            pexels_api_key: None,
            images_per_segment: 3,
        }
    }
}

/// Output frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Invalid resolution '{}', expected WIDTHxHEIGHT", s))?;

        let width = w
            .parse()
            .map_err(|_| format!("Invalid resolution width '{}'", w))?;
        let height = h
            .parse()
            .map_err(|_| format!("Invalid resolution height '{}'", h))?;

        Ok(Self { width, height })
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Video assembly settings
#[derive(Debug, Clone)]
pub struct VideoConfig {
    pub resolution: Resolution,
    pub fps: u32,
    /// Length of the whole video, title cards included
    pub target_duration_seconds: u32,
    pub ffmpeg_bin: String,
    /// Intro and outro cards around the news segments
    pub title_cards: bool,
    /// Font for text overlays; it must cover Kannada script
    pub font_file: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 1080,
                height: 1920,
            },
            fps: 30,
            target_duration_seconds: 60,
            ffmpeg_bin: "ffmpeg".to_string(),
            title_cards: true,
            font_file: None,
        }
    }
}

impl VideoConfig {
    /// Seconds left for news segments once the title cards are placed
    pub fn content_seconds(&self) -> f64 {
        let target = self.target_duration_seconds as f64;
        if self.title_cards {
            target - INTRO_SECONDS - OUTRO_SECONDS
        } else {
            target
        }
    }
}

/// Video platform upload settings
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    /// Bound for sending the video bytes, separate from the API call timeout
    pub upload_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client_id: None,
            client_secret: None,
            refresh_token: None,
            upload_timeout: Duration::from_secs(600),
        }
    }
}

impl UploadConfig {
    /// Whether every OAuth credential is present
    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }
}

/// Settings that shape a run rather than a single adapter
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Fewest collected articles a run may continue with
    pub min_segments: usize,
    /// Root of the audio, media and video caches
    pub workdir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_segments: 1,
            workdir: PathBuf::from("./data"),
        }
    }
}

/// Configuration for every adapter and the pipeline
#[derive(Debug, Clone, Default)]
pub struct AgentsConfig {
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub media: MediaConfig,
    pub video: VideoConfig,
    pub upload: UploadConfig,
    /// Timeout and retry policy shared by every external call
    pub http: RetryPolicy,
    pub pipeline: PipelineSettings,
}

impl AgentsConfig {
    /// Creates configuration from environment variables
    ///
    /// Credentials:
    /// - OPENAI_API_KEY, ELEVENLABS_API_KEY, NEWS_API_KEY
    /// - UNSPLASH_API_KEY, PEXELS_API_KEY
    /// - YOUTUBE_CLIENT_ID, YOUTUBE_CLIENT_SECRET, YOUTUBE_REFRESH_TOKEN
    ///
    /// Everything else is optional and falls back to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let resolution = match env_opt("VIDEO_RESOLUTION") {
            Some(raw) => raw.parse::<Resolution>().map_err(anyhow::Error::msg)?,
            None => defaults.video.resolution,
        };

        let config = Self {
            news: NewsConfig {
                api_key: env_opt("NEWS_API_KEY"),
                max_per_category: env_or("MAX_NEWS_PER_CATEGORY", defaults.news.max_per_category),
            },
            llm: LlmConfig {
                api_key: env_opt("OPENAI_API_KEY"),
                model: env_or("OPENAI_MODEL", defaults.llm.model),
                target_language: env_or("TARGET_LANGUAGE", defaults.llm.target_language),
                base_url: env_or("OPENAI_BASE_URL", defaults.llm.base_url),
            },
            speech: SpeechConfig {
                api_key: env_opt("ELEVENLABS_API_KEY"),
                voice_id: env_or("ELEVENLABS_VOICE_ID", defaults.speech.voice_id),
                model_id: env_or("ELEVENLABS_MODEL_ID", defaults.speech.model_id),
                stability: env_or("ELEVENLABS_VOICE_STABILITY", defaults.speech.stability),
                similarity: env_or("ELEVENLABS_VOICE_SIMILARITY", defaults.speech.similarity),
                base_url: defaults.speech.base_url,
            },
            media: MediaConfig {
                unsplash_api_key: env_opt("UNSPLASH_API_KEY"),
                pexels_api_key: env_opt("PEXELS_API_KEY"),
                images_per_segment: env_or("IMAGES_PER_SEGMENT", defaults.media.images_per_segment),
            },
            video: VideoConfig {
                resolution,
                fps: env_or("VIDEO_FPS", defaults.video.fps),
                target_duration_seconds: env_or(
                    "TARGET_DURATION_SECONDS",
                    defaults.video.target_duration_seconds,
                ),
                ffmpeg_bin: env_or("FFMPEG_BIN", defaults.video.ffmpeg_bin),
                title_cards: env_flag("VIDEO_TITLE_CARDS", defaults.video.title_cards),
                font_file: env_opt("VIDEO_FONT_FILE").map(PathBuf::from),
            },
            upload: UploadConfig {
                enabled: env_flag("VIDEO_UPLOAD_ENABLED", defaults.upload.enabled),
                client_id: env_opt("YOUTUBE_CLIENT_ID"),
                client_secret: env_opt("YOUTUBE_CLIENT_SECRET"),
                refresh_token: env_opt("YOUTUBE_REFRESH_TOKEN"),
                upload_timeout: Duration::from_secs(env_or(
                    "YOUTUBE_UPLOAD_TIMEOUT_SECONDS",
                    defaults.upload.upload_timeout.as_secs(),
                )),
            },
            http: RetryPolicy {
                timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECONDS", 30)),
                max_retries: env_or("HTTP_MAX_RETRIES", defaults.http.max_retries),
                initial_backoff: Duration::from_millis(env_or("HTTP_INITIAL_BACKOFF_MS", 500)),
                max_backoff: Duration::from_millis(env_or("HTTP_MAX_BACKOFF_MS", 8000)),
            },
            pipeline: PipelineSettings {
                min_segments: env_or("MIN_SEGMENTS", defaults.pipeline.min_segments),
                workdir: env_opt("WORKDIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.pipeline.workdir),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.news.max_per_category == 0 {
            anyhow::bail!("MAX_NEWS_PER_CATEGORY must be greater than 0");
        }

        if self.llm.model.is_empty() {
            anyhow::bail!("OPENAI_MODEL cannot be empty");
        }

        for (name, value) in [
            ("ELEVENLABS_VOICE_STABILITY", self.speech.stability),
            ("ELEVENLABS_VOICE_SIMILARITY", self.speech.similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be between 0.0 and 1.0", name);
            }
        }

        if self.media.images_per_segment == 0 {
            anyhow::bail!("IMAGES_PER_SEGMENT must be greater than 0");
        }

        if self.video.resolution.width == 0 || self.video.resolution.height == 0 {
            anyhow::bail!("VIDEO_RESOLUTION must be non-zero");
        }

        if self.video.fps == 0 {
            anyhow::bail!("VIDEO_FPS must be greater than 0");
        }

        if self.video.target_duration_seconds == 0 {
            anyhow::bail!("TARGET_DURATION_SECONDS must be greater than 0");
        }

        if self.video.content_seconds() <= 0.0 {
            anyhow::bail!(
                "TARGET_DURATION_SECONDS must exceed the {}s of title cards",
                INTRO_SECONDS + OUTRO_SECONDS
            );
        }

        if self.upload.upload_timeout.is_zero() {
            anyhow::bail!("YOUTUBE_UPLOAD_TIMEOUT_SECONDS must be greater than 0");
        }

        if self.pipeline.min_segments == 0 {
            anyhow::bail!("MIN_SEGMENTS must be greater than 0");
        }

        if self.http.timeout.is_zero() {
            anyhow::bail!("HTTP_TIMEOUT_SECONDS must be greater than 0");
        }

        if self.http.initial_backoff > self.http.max_backoff {
            anyhow::bail!("HTTP_INITIAL_BACKOFF_MS cannot exceed HTTP_MAX_BACKOFF_MS");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentsConfig::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.target_language, "Kannada");
        assert_eq!(config.speech.voice_id, "pNInz6obpgDQGcFmaJgB");
        assert_eq!(config.video.resolution.to_string(), "1080x1920");
        assert_eq!(config.video.fps, 30);
        assert_eq!(config.http.max_retries, 2);
        assert!(config.upload.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AgentsConfig::default();

        config.speech.stability = 1.5;
        assert!(config.validate().is_err());
        config.speech.stability = 0.5;

        config.video.fps = 0;
        assert!(config.validate().is_err());
        config.video.fps = 24;

        config.http.initial_backoff = Duration::from_secs(10);
        assert!(config.validate().is_err());
        config.http.initial_backoff = Duration::from_millis(500);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_title_cards_take_from_content_time() {
        let mut video = VideoConfig::default();
        assert_eq!(video.content_seconds(), 55.0);

        video.title_cards = false;
        assert_eq!(video.content_seconds(), 60.0);

        let mut config = AgentsConfig::default();
        config.video.target_duration_seconds = 5;
        assert!(config.validate().is_err());
        config.video.title_cards = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!(
            "720x1280".parse::<Resolution>().unwrap(),
            Resolution {
                width: 720,
                height: 1280
            }
        );
        assert!("1080".parse::<Resolution>().is_err());
        assert!("widexhigh".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_upload_credentials() {
        let mut upload = UploadConfig::default();
        assert!(!upload.has_credentials());

        upload.client_id = Some("id".to_string());
        upload.client_secret = Some("secret".to_string());
        assert!(!upload.has_credentials());

        upload.refresh_token = Some("token".to_string());
        assert!(upload.has_credentials());
    }
}
