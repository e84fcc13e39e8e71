//! Upload to YouTube through the Data API v3
//!
//! An access token is obtained from the configured OAuth refresh token for
//! every upload. The video is sent with the resumable protocol: the token
//! and session calls are retried like any API call, while an interrupted
//! transfer asks the session how far it got and resumes from there.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsreel_core::domain::article::Category;
use newsreel_core::domain::health::ComponentHealth;
use newsreel_core::domain::run::{UploadOutcome, VideoArtifact};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::error::{AdapterError, Result};
use crate::http::check_response;
use crate::retry::RetryPolicy;

const ADAPTER: &str = "upload";

/// YouTube's limit on the combined length of all tags
pub const MAX_TAGS_LENGTH: usize = 500;

/// "News & Politics"
const NEWS_CATEGORY_ID: &str = "25";

/// Publishes an assembled video
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, artifact: &VideoArtifact, metadata: &VideoMetadata) -> Result<UploadOutcome>;

    async fn probe(&self) -> ComponentHealth;
}

/// Title, description and tags of an upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

const BASE_TAGS: [&str; 12] = [
    "Kannada news",
    "Karnataka news",
    "Bangalore news",
    "South India news",
    "India news",
    "Kannada updates",
    "news in Kannada",
    "today's news",
    "breaking news",
    "latest news",
    "current affairs",
    "news update",
];

fn category_tags(category: Category) -> &'static [&'static str] {
    match category {
        Category::International => &["international news", "world news", "global news"],
        Category::National => &["national news", "India news", "central government"],
        Category::Karnataka => &["Karnataka", "Bangalore", "Bengaluru", "Karnataka government"],
        Category::TamilNadu => &["Tamil Nadu", "Chennai", "TN news"],
        Category::Andhra => &["Andhra Pradesh", "Hyderabad", "AP news", "Telangana"],
        Category::Kerala => &["Kerala", "Kochi", "Kerala news"],
    }
}

/// Drops duplicate tags and keeps as many as fit in `MAX_TAGS_LENGTH`
/// characters, counting a ", " separator after each tag
pub fn limit_tags(tags: Vec<String>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    let mut length = 0;

    for tag in tags {
        if kept.iter().any(|k| k.eq_ignore_ascii_case(&tag)) {
            continue;
        }
        let cost = tag.chars().count() + 2;
        if length + cost > MAX_TAGS_LENGTH {
            break;
        }
        length += cost;
        kept.push(tag);
    }

    kept
}

impl VideoMetadata {
    /// Metadata for a video covering `categories`, dated `date`
    pub fn for_categories(categories: &[Category], date: DateTime<Utc>) -> Self {
        let day = date.format("%B %d, %Y");

        let title = if categories.contains(&Category::Karnataka) {
            format!("Today's Karnataka News in Kannada | {} | Breaking Updates", day)
        } else {
            format!("Latest Kannada News Updates | {} | South India News", day)
        };

        let mut description = vec![
            format!("Today's top news stories in Kannada - {}", day),
            String::new(),
            "In this video:".to_string(),
        ];
        description.extend(
            categories
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{}. {}", i + 1, c.display_name())),
        );
        description.extend(
            [
                "",
                "Subscribe for daily Kannada news updates!",
                "",
                "#KannadaNews #Karnataka #BangaloreNews #SouthIndiaNews #IndiaNews",
                "",
                "Narration generated with text-to-speech.",
            ]
            .map(String::from),
        );

        let tags = BASE_TAGS
            .iter()
            .chain(categories.iter().flat_map(|c| category_tags(*c).iter()))
            .map(|t| t.to_string())
            .collect();

        Self {
            title,
            description: description.join("\n"),
            tags: limit_tags(tags),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

/// Where a resumable upload session stands
#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Complete(String),
    /// Bytes the platform has stored so far
    Incomplete(usize),
}

/// Bytes stored according to a `Range: bytes=0-K` header
fn received_bytes(range: &str) -> Option<usize> {
    let (_, last) = range.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse::<usize>().ok().map(|k| k + 1)
}

/// A transfer that broke off may have reached the platform anyway
fn interrupted(err: &AdapterError) -> bool {
    match err {
        AdapterError::Request { .. } => true,
        AdapterError::Api { status, .. } => *status >= 500,
        other => other.is_transient(),
    }
}

async fn session_state(response: Response) -> Result<SessionState> {
    // "Resume Incomplete"
    if response.status() == StatusCode::PERMANENT_REDIRECT {
        let received = response
            .headers()
            .get(reqwest::header::RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(received_bytes)
            .unwrap_or(0);
        return Ok(SessionState::Incomplete(received));
    }

    let response = check_response(ADAPTER, response).await.map_err(rejected)?;
    let uploaded: UploadedVideo = response
        .json()
        .await
        .map_err(|e| AdapterError::parse(ADAPTER, e))?;
    Ok(SessionState::Complete(uploaded.id))
}

pub struct YouTubeUploader {
    client: Client,
    policy: RetryPolicy,
    config: UploadConfig,
    token_url: String,
    upload_url: String,
    thumbnail_url: String,
}

impl YouTubeUploader {
    pub fn new(client: Client, policy: RetryPolicy, config: UploadConfig) -> Self {
        Self {
            client,
            policy,
            config,
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            upload_url: "https://www.googleapis.com/upload/youtube/v3/videos".to_string(),
            thumbnail_url: "https://www.googleapis.com/upload/youtube/v3/thumbnails/set"
                .to_string(),
        }
    }

    /// Exchanges the refresh token for an access token
    async fn access_token(&self) -> Result<String> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
            self.config.refresh_token.as_deref(),
        ) else {
            return Err(AdapterError::MissingCredential { adapter: ADAPTER });
        };

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;

        // invalid_grant comes back as 400
        if response.status() == StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            return Err(AdapterError::AuthFailure {
                adapter: ADAPTER,
                message,
            });
        }
        let response = check_response(ADAPTER, response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(ADAPTER, e))?;
        Ok(token.access_token)
    }

    fn request_body(metadata: &VideoMetadata) -> serde_json::Value {
        serde_json::json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": NEWS_CATEGORY_ID,
                "defaultLanguage": "kn",
                "defaultAudioLanguage": "kn"
            },
            "status": {
                "privacyStatus": "public",
                "selfDeclaredMadeForKids": false
            }
        })
    }

    /// Opens a resumable session and returns its URI
    async fn open_session(&self, token: &str, length: usize, metadata: &VideoMetadata) -> Result<String> {
        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", length)
            .json(&Self::request_body(metadata))
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;
        let response = check_response(ADAPTER, response).await.map_err(rejected)?;

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AdapterError::parse(ADAPTER, "upload session has no Location header"))
    }

    /// Sends the bytes from `offset` on, bounded by the upload timeout
    async fn put_video(&self, session: &str, token: &str, video: &[u8], offset: usize) -> Result<SessionState> {
        let total = video.len();
        let mut request = self
            .client
            .put(session)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .timeout(self.config.upload_timeout);
        if offset > 0 {
            request = request.header(
                reqwest::header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", offset, total - 1, total),
            );
        }

        let response = request
            .body(video[offset..].to_vec())
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.config.upload_timeout))?;
        session_state(response).await
    }

    /// Asks the platform how much of the video it already holds
    async fn session_status(&self, session: &str, token: &str, total: usize) -> Result<SessionState> {
        let response = self
            .client
            .put(session)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_RANGE, format!("bytes */{}", total))
            .body(Vec::<u8>::new())
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;
        session_state(response).await
    }

    /// Sends the video into an open session, resuming after interruptions
    ///
    /// The session is never reopened here: a second session for the same
    /// bytes would publish the video twice.
    async fn transfer(&self, session: &str, token: &str, video: &[u8]) -> Result<String> {
        let total = video.len();
        let mut offset = 0;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.policy.backoff(attempt)).await;
            }

            let state = match self.put_video(session, token, video, offset).await {
                Ok(state) => state,
                Err(e) if interrupted(&e) => {
                    warn!(attempt, offset, "Upload interrupted, querying session: {}", e);
                    self.policy
                        .run(ADAPTER, || self.session_status(session, token, total))
                        .await?
                }
                Err(e) => return Err(e),
            };

            match state {
                SessionState::Complete(video_id) => return Ok(video_id),
                SessionState::Incomplete(received) => {
                    // The last byte is always resent so the range stays valid
                    offset = received.min(total - 1);
                    debug!(received, total, "Resuming upload");
                }
            }
        }

        Err(AdapterError::Timeout {
            adapter: ADAPTER,
            after: self.config.upload_timeout,
        })
    }

    async fn send_thumbnail(&self, token: &str, video_id: &str, image: &[u8]) -> Result<()> {
        let response = self
            .client
            .post(&self.thumbnail_url)
            .query(&[("videoId", video_id)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;
        check_response(ADAPTER, response).await?;
        Ok(())
    }

    /// Sets the custom thumbnail; the video stays published either way
    async fn set_thumbnail(&self, token: &str, video_id: &str, path: &Path) -> bool {
        let image = match tokio::fs::read(path).await {
            Ok(image) => image,
            Err(e) => {
                warn!(%video_id, path = %path.display(), "Thumbnail unreadable: {}", e);
                return false;
            }
        };

        match self
            .policy
            .run(ADAPTER, || self.send_thumbnail(token, video_id, &image))
            .await
        {
            Ok(()) => {
                info!(%video_id, "Thumbnail set");
                true
            }
            Err(e) => {
                warn!(%video_id, "Thumbnail not set: {}", e);
                false
            }
        }
    }
}

/// The platform refusing the video (bad metadata, quota) is a rejection,
/// not an outage
fn rejected(err: AdapterError) -> AdapterError {
    match err {
        AdapterError::Api { status, message, .. } if (400..500).contains(&status) => {
            AdapterError::UploadRejected(format!("status {}: {}", status, message))
        }
        other => other,
    }
}

#[async_trait]
impl Uploader for YouTubeUploader {
    async fn upload(&self, artifact: &VideoArtifact, metadata: &VideoMetadata) -> Result<UploadOutcome> {
        let video = tokio::fs::read(&artifact.path).await?;
        if video.is_empty() {
            return Err(AdapterError::Validation(format!(
                "{} is empty",
                artifact.path.display()
            )));
        }

        let token = self.policy.run(ADAPTER, || self.access_token()).await?;
        let session = self
            .policy
            .run(ADAPTER, || self.open_session(&token, video.len(), metadata))
            .await?;
        let video_id = self.transfer(&session, &token, &video).await?;

        let url = format!("https://youtu.be/{}", video_id);
        info!(%video_id, %url, "Video uploaded");

        let thumbnail_set = match &artifact.thumbnail {
            Some(path) => self.set_thumbnail(&token, &video_id, path).await,
            None => false,
        };

        Ok(UploadOutcome::Uploaded {
            video_id,
            url,
            uploaded_at: Utc::now(),
            thumbnail_set,
        })
    }

    /// Refreshes the access token, which checks both reachability and the
    /// credentials
    async fn probe(&self) -> ComponentHealth {
        if !self.config.has_credentials() {
            return ComponentHealth::unreachable(ADAPTER, "credential not configured");
        }

        match RetryPolicy::probe(self.policy.timeout)
            .run(ADAPTER, || self.access_token())
            .await
        {
            Ok(_) => ComponentHealth::healthy(ADAPTER),
            Err(e) => ComponentHealth::unreachable(ADAPTER, e.to_string()),
        }
    }
}
